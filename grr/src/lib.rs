#[cfg(feature = "core")]
#[doc(inline)]
pub use grr_core as core;

#[cfg(feature = "repository")]
#[doc(inline)]
pub use grr_repository as repository;

#[cfg(feature = "tables")]
#[doc(inline)]
pub use grr_tables as tables;

#[cfg(feature = "scores")]
#[doc(inline)]
pub use grr_scores as scores;

#[cfg(feature = "resources")]
#[doc(inline)]
pub use grr_resources as resources;

#[cfg(feature = "annotation")]
#[doc(inline)]
pub use grr_annotation as annotation;

#[cfg(feature = "taskgraph")]
#[doc(inline)]
pub use grr_taskgraph as taskgraph;
