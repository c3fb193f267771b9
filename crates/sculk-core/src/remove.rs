use crate::{CoreError, PackSession};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Default, Serialize)]
pub struct RemoveReport {
    pub removed: String,
    /// Dependencies that nothing else needed any more, in removal order.
    pub cascaded: Vec<String>,
    /// Manifests that still declared `removed` as a dependency.
    pub dependants: Vec<String>,
}

/// Remove a file manifest or loose file from the pack.
///
/// Dependencies pulled in only for the removed manifest go with it.
/// The caller commits the session.
pub fn remove_path(session: &mut PackSession, path: &str) -> Result<RemoveReport, CoreError> {
    let path = path.trim_start_matches("./");
    let mut report = RemoveReport {
        removed: path.to_owned(),
        ..RemoveReport::default()
    };

    if session.pack.contains_manifest(path) {
        if let Some(dependants) = session.graph.dependants(path) {
            if !dependants.is_empty() {
                warn!(
                    "{path} is a dependency of {}, removing it anyway",
                    dependants.join(", ")
                );
                report.dependants = dependants.to_vec();
            }
        }
        session.pack.remove_manifest(path);
        for freed in session.graph.release(path) {
            if session.pack.remove_manifest(&freed).is_some() {
                info!("removed unused dependency {freed}");
                report.cascaded.push(freed);
            }
        }
        info!("removed {path}");
        return Ok(report);
    }

    if session.pack.remove_file(path) {
        info!("stopped tracking {path}");
        return Ok(report);
    }

    Err(CoreError::InvalidInput(format!(
        "'{path}' is neither a file manifest nor a tracked file in this pack"
    )))
}
