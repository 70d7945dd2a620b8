pub mod commands;
pub mod handle;
pub mod registry;
pub mod snapshot;
pub mod view_actor;

pub use commands::{ViewCommand, ViewConfig, ViewState};
pub use handle::ViewHandle;
pub use registry::ViewRegistry;
pub use snapshot::{DerivedView, SourcePane, ViewSnapshot};
pub use view_actor::ViewActor;
