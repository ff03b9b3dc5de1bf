//! Tasksync engine: HTTP access to the task API and the async runtimes around it.
mod api;
mod device;
mod engine;
mod persist;
mod poller;
mod queue;
mod save;
mod types;

pub use api::{ApiSettings, ChannelEventSink, EventSink, ReqwestTaskApi, TaskApi};
pub use device::{DeviceId, DEVICE_ID_HEADER};
pub use engine::{EngineHandle, EngineSettings};
pub use persist::{ensure_output_dir, write_atomic, PersistError, StagedFile};
pub use poller::{spawn_poller, PollerHandle};
pub use queue::{QueueObserver, QueueTimings, SaveError, SequentialDownloader, MISSING_URL_MESSAGE};
pub use save::{sanitize_filename, ArtifactSaver};
pub use types::{ApiError, EngineError, EngineEvent, FailureKind};
