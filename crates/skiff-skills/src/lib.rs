//! # skiff-skills
//!
//! Skills are Markdown instructions that teach the model a workflow. Each
//! skill is a directory containing a `SKILL.md` file (Markdown with YAML
//! frontmatter). Skills are never executed; a selected skill's body is
//! injected into the system prompt and the model follows it with its tools.
//!
//! ## SKILL.md Format
//!
//! ```markdown
//! ---
//! name: pdf
//! title: PDF toolkit
//! description: Extract text and tables from PDF files
//! allowed-tools: [read, bash]
//! ---
//!
//! # PDF toolkit
//!
//! 1. Run `{baseDir}/scripts/extract.sh <file>` with the shell tool
//! ```
//!
//! ## Selection
//!
//! 1. [`ranker::rank`] scores every catalog skill by lexical overlap and
//!    keeps a shortlist of at most eight.
//! 2. [`router::SkillRouter`] shows the model the shortlist summaries and
//!    parses its JSON choice.
//! 3. [`selector::select`] combines the two and falls back to the top-ranked
//!    skill whenever routing is unavailable or unusable.

pub mod definition;
pub mod ranker;
pub mod registry;
pub mod router;
pub mod selector;
pub mod sync;

pub use definition::{Skill, SkillSource, normalize_name};
pub use ranker::{Ranking, ScoredCandidate, rank};
pub use registry::{Catalog, SkillRegistry, remote_skill_dirs};
pub use router::{RouteDecision, SkillRouter};
pub use selector::{Selection, SelectionMethod, select};
pub use sync::{SkillSync, SyncAction, SyncOutcome};
