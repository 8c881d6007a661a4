pub mod download_session;
pub mod surface;
pub mod timers;
pub mod typewriter;

pub use download_session::{AckOutcome, DownloadSession};
pub use surface::{FieldSurface, ModalPresenter, PlaceholderSurface};
pub use timers::{Scheduler, TimerHandle};
pub use typewriter::{TypewriterConfig, TypewriterSession};
