pub mod currency {
    //!
    //! Compiled-in currency parameters the genesis definition depends on.
    //!

    pub const CRYPTONOTE_NAME: &str = "karai";

    /// Human readable prefix of every account address
    pub const ADDRESS_PREFIX: &str = "kai";

    pub const CURRENT_TRANSACTION_VERSION: u8 = 1;

    /// Number of blocks a coinbase output stays locked
    pub const MINED_MONEY_UNLOCK_WINDOW: u64 = 40;

    /// Premine paid by the genesis transaction, split among the reward addresses
    pub const GENESIS_BLOCK_REWARD: u64 = 0;

    /// Public key carried in the extra field of the genesis transaction
    pub const GENESIS_TX_PUBLIC_KEY: [u8; 32] = [
        0xb7, 0xef, 0x04, 0xd5, 0x07, 0xca, 0x64, 0xfc, 0x7f, 0x7b, 0x55, 0x77, 0x78, 0xd9, 0x54, 0x53, 0x3a, 0x5f, 0x51, 0xe1, 0x9d,
        0xe1, 0x6c, 0x32, 0x13, 0xab, 0xef, 0xee, 0x7a, 0xe3, 0x11, 0x38,
    ];

    /// Encoded genesis transaction, regenerate with `karaid --print-genesis-tx`
    pub const GENESIS_COINBASE_TX_HEX: &str =
        "0128000000000000000000000000000000210000000000000001b7ef04d507ca64fc7f7b557778d954533a5f51e19de16c3213abefee7ae31138";
}

pub mod network {
    pub const P2P_DEFAULT_PORT: u16 = 11997;
    pub const RPC_DEFAULT_PORT: u16 = 11998;

    /// File in the data directory holding the persisted peer list
    pub const P2P_STATE_FILE: &str = "p2pstate.json";
}

pub mod database {
    /// Sub-directory of the data directory holding the store
    pub const DATABASE_DIR: &str = "DB";

    pub const DATABASE_DEFAULT_MAX_OPEN_FILES: u32 = 100;
    pub const DATABASE_READ_BUFFER_MB_DEFAULT_SIZE: u32 = 10;
    pub const DATABASE_WRITE_BUFFER_MB_DEFAULT_SIZE: u32 = 256;
    pub const DATABASE_DEFAULT_BACKGROUND_THREADS_COUNT: u32 = 2;
}
