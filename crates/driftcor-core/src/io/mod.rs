pub mod record;
pub mod ser;
pub mod session;
pub mod volume;

pub use record::{ElementType, RecordDescriptor, RecordElement, RecordFile};
pub use ser::SerReader;
pub use session::CacheSession;
pub use volume::{load_volume, save_stack};
