mod db;
mod errors;
mod item;
mod lifecycle;
mod schema;
mod writer;

pub mod utils;

pub mod prelude {
    use crate::{db, errors, lifecycle, schema};

    pub use super::item::CachedDbItem;
    pub use super::writer::{DbWriter, DirectDbWriter};
    pub use db::{ConnBuilder, DbTuning, DB};
    pub use errors::{StoreError, StoreResult, StoreResultExt};
    pub use lifecycle::StoreHandle;
    pub use schema::{SchemaStatus, CURRENT_DB_SCHEME_VERSION, DB_SCHEME_VERSION_KEY};
}
