pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    Acknowledgement, ButtonAffordance, DownloadPhase, FieldDecoration, Notice, NoticeKind,
    PackageName,
};
