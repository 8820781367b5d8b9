pub mod geo;
pub mod onesignal;
pub mod translate;

pub use geo::*;
pub use onesignal::*;
pub use translate::*;
