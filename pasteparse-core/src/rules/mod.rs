// Rule stages of the pipeline, both driven by the cross-reference rules:
// - mapper.rs: renames extracted keys to canonical field names
// - translator.rs: assigns fixed or derived values to fields

pub mod mapper;
pub mod translator;

pub use mapper::FieldMapper;
pub use translator::ValueTranslator;
