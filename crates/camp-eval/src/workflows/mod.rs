pub mod camp;
pub mod closure;
pub mod evaluation;
pub mod import;
