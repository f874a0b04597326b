// Content editor: draft sessions, per-kind field schemas, autosave and
// recovery, quality scoring, and commit payload assembly.

pub mod autosave;
pub mod drafts;
pub mod fields;
pub mod handlers;
pub mod pipeline;
pub mod quality;
pub mod registry;
pub mod schema;
pub mod session;
