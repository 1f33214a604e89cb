//! FlagDraw Core Library
//!
//! Platform-agnostic drawing surface, tool state and flag persistence for the
//! FlagDraw flag designer.

pub mod color;
pub mod export;
pub mod gallery;
pub mod history;
pub mod raster;
pub mod storage;
pub mod surface;
pub mod tools;
pub mod view;

pub use color::Rgba;
pub use export::{DataUrl, DataUrlError, MAX_IMAGE_DATA_LEN};
pub use gallery::{FlagGateway, Gallery, GalleryError, OwnedStore};
pub use history::{MAX_UNDO_HISTORY, Operation, OperationLog};
pub use raster::PixelBuffer;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use surface::{CANVAS_HEIGHT, CANVAS_WIDTH, DrawingSessionState, DrawingSurface, ExportError};
pub use tools::{StyleState, Template, ToolConfig, ToolKind};
pub use view::View;
