pub(crate) mod attempt_store;
pub(crate) mod attempts;
pub(crate) mod exams;
pub(crate) mod invites;
pub(crate) mod memberships;
pub(crate) mod organizations;
pub(crate) mod questions;
pub(crate) mod responses;
pub(crate) mod sections;
pub(crate) mod users;
