pub(crate) mod aggregate;
pub(crate) mod question_bank_import;
pub(crate) mod sampler;
pub(crate) mod scoring;
pub(crate) mod test_sessions;
