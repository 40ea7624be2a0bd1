pub(crate) mod attempts;
pub(crate) mod grading;
pub(crate) mod invite_codes;
pub(crate) mod membership;
