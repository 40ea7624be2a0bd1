mod create;
mod list;
mod manage;

pub(super) use create::create_exam;
pub(super) use list::{get_exam, list_exams};
pub(super) use manage::{delete_exam, publish_exam, update_exam};
