use std::path::Path;

use crate::errors::AppError;
use crate::image_data;
use crate::store::{LocalStore, Machine};

/// Register a new machine from what the user typed and picked.
///
/// A cancelled prompt (`None`), a blank label or a cancelled file picker
/// aborts silently with `Ok(None)`. The image is read before anything is
/// written, so a failed read leaves the store untouched.
pub fn add_machine(
    store: &LocalStore,
    raw_label: Option<&str>,
    image_path: Option<&Path>,
) -> Result<Option<i64>, AppError> {
    let Some(label) = raw_label.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };
    let Some(path) = image_path else {
        return Ok(None);
    };
    let image = image_data::encode_file(path)?;
    let id = store.create_machine(label, &image)?;
    Ok(Some(id))
}

pub fn list_machines(store: &LocalStore) -> Result<Vec<Machine>, AppError> {
    Ok(store.list_machines()?)
}
