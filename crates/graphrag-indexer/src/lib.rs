//! The indexing pipeline (spec §2, §4.3–§4.5): detect → extract → build,
//! wrapped as a library so the CLI binary stays a thin arg-parsing shell,
//! the way `rpg-cli`'s commands call straight into `rpg-core`/`rpg-parser`.

pub mod pipeline;
