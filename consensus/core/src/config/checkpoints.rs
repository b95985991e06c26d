/// A compiled-in checkpoint: a block hash pinned at a height
pub struct CheckpointData {
    pub height: u32,
    pub hash: &'static str,
}

/// Builtin checkpoints, strictly increasing in height
pub const CHECKPOINTS: &[CheckpointData] = &[
    CheckpointData { height: 10000, hash: "fcbd1eefcfa34999cc7f75ca72635beecc14b502c42427ae2f9f0e3765b4b9b6" },
    CheckpointData { height: 25000, hash: "b2506d1f91e25868c61c7ccd2804cc1a60f76b1f0976887d7abd6d8d97d8cbcd" },
    CheckpointData { height: 50000, hash: "dd7346ba2ae45967503a8b129c15b1a6f23975750c1e003a24353aa0044a2043" },
    CheckpointData { height: 75000, hash: "958d42a6ca649fc0e510e57cfaa40208a3d3b2222397adde9eca84cbe63afccb" },
    CheckpointData { height: 100000, hash: "e7be2c094192fe657a333837001ef815c22bd0faf2f75e2652fce1350d9a7740" },
    CheckpointData { height: 150000, hash: "d5a8995dd006a66586b1edaedf57229ed253f23e1d87bdd2a2abef18a11ba048" },
    CheckpointData { height: 200000, hash: "d32f7835eda9c3bf4bf4ac2550e8dc3d9335697b0d734cce76326fe946d08b06" },
    CheckpointData { height: 250000, hash: "2df426af560b64c96cb088fe21db31c360e9596b700799161610f3c0f2c08ae0" },
    CheckpointData { height: 300000, hash: "9ec7477ee46cd5724ce212bac6df7aefd25c339ba67c9f45fb94f1df66e52515" },
];
