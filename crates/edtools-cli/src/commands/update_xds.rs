use super::CommandContext;
use crate::cli::{UpdateXdsArgs, fixed};
use crate::config::resolution_arg;
use crate::error::{CliError, Result};
use crate::utils::discovery;
use edtools::core::io::xds_inp::XdsInpUpdate;
use edtools::core::models::cell::UnitCell;
use edtools::engine::progress::ProgressReporter;
use tracing::info;

pub fn run(args: UpdateXdsArgs, ctx: &CommandContext) -> Result<()> {
    let update = build_update(&args)?;
    if update == XdsInpUpdate::default() {
        return Err(CliError::Argument(
            "nothing to change; pass at least one edit option".to_string(),
        ));
    }

    let paths = discovery::find_files(&args.paths, "XDS.INP", args.match_dir.as_deref());
    if paths.is_empty() {
        return Err(CliError::Argument("no XDS.INP files found".to_string()));
    }

    let progress = ctx.progress();
    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let results = ctx.pool.run(&paths, &reporter, |path, _| update.update_file(path));

    let mut updated = 0;
    for (path, result) in paths.iter().zip(&results) {
        match result {
            Ok(backup) => {
                updated += 1;
                info!(file = %path.display(), backup = %backup.display(), "Updated XDS.INP.");
            }
            Err(e) => println!("Could not update {}: {}", path.display(), e),
        }
    }
    println!("Updated {} of {} files", updated, paths.len());
    Ok(())
}

fn build_update(args: &UpdateXdsArgs) -> Result<XdsInpUpdate> {
    let cell = match args.cell.as_deref() {
        Some(values) => {
            let params = fixed::<6>(values).ok_or_else(|| {
                CliError::Argument(format!("expected six cell parameters, got {}", values.len()))
            })?;
            Some(UnitCell::new(params).map_err(|e| CliError::Argument(e.to_string()))?)
        }
        None => None,
    };
    let max_error = match args.max_error.as_deref() {
        Some(values) => Some(fixed::<2>(values).ok_or_else(|| {
            CliError::Argument(format!("expected axis and angle errors, got {} values", values.len()))
        })?),
        None => None,
    };

    Ok(XdsInpUpdate {
        cell,
        space_group: args.spgr,
        comment: args.comment,
        max_cell_axis_error: max_error.map(|[axis, _]| axis),
        max_cell_angle_error: max_error.map(|[_, angle]| angle),
        overload: args.overload,
        resolution: resolution_arg(args.resolution.as_deref())?,
        wfac1: args.wfac1,
        cut_frames: args.cut_frames,
        append: args.append.clone(),
        jobs: args.jobs.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    const XDS_INP: &str = "\
JOB= XYCORR INIT COLSPOT IDXREF DEFPIX INTEGRATE CORRECT
DATA_RANGE= 1 100
SPOT_RANGE= 1 100
SPACE_GROUP_NUMBER= 0
UNIT_CELL_CONSTANTS= 10 20 30 90 90 90
OVERLOAD= 130000
";

    fn args(paths: Vec<PathBuf>) -> UpdateXdsArgs {
        UpdateXdsArgs {
            paths,
            match_dir: None,
            spgr: None,
            cell: None,
            comment: false,
            max_error: None,
            overload: None,
            resolution: None,
            cut_frames: false,
            wfac1: None,
            append: None,
            jobs: Vec::new(),
        }
    }

    fn xds_dir(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("XDS.INP"), XDS_INP).unwrap();
        dir
    }

    #[test]
    fn edits_every_found_file_and_keeps_backups() {
        let root = tempdir().unwrap();
        let first = xds_dir(root.path(), "exp_001");
        let second = xds_dir(root.path(), "exp_002");

        let mut a = args(vec![root.path().to_path_buf()]);
        a.spgr = Some(14);
        a.cell = Some(vec![10.5, 12.0, 14.2, 90.0, 97.3, 90.0]);
        a.jobs = vec!["correct".to_string()];
        run(a, &context()).unwrap();

        for dir in [first, second] {
            let text = fs::read_to_string(dir.join("XDS.INP")).unwrap();
            assert!(text.starts_with("JOB= CORRECT\n"));
            assert!(text.contains("SPACE_GROUP_NUMBER= 14"));
            assert!(text.contains("UNIT_CELL_CONSTANTS= 10.500 12.000 14.200 90.000 97.300 90.000"));
            assert_eq!(fs::read_to_string(dir.join("XDS.INP~")).unwrap(), XDS_INP);
        }
    }

    #[test]
    fn match_limits_the_edited_files() {
        let root = tempdir().unwrap();
        let kept = xds_dir(root.path(), "SMV");
        let other = xds_dir(root.path(), "tiff");

        let mut a = args(vec![root.path().to_path_buf()]);
        a.match_dir = Some("SMV".to_string());
        a.overload = Some(65535);
        run(a, &context()).unwrap();

        assert!(fs::read_to_string(kept.join("XDS.INP")).unwrap().contains("OVERLOAD= 65535"));
        assert_eq!(fs::read_to_string(other.join("XDS.INP")).unwrap(), XDS_INP);
    }

    #[test]
    fn error_pair_is_split_into_axis_and_angle() {
        let mut a = args(Vec::new());
        a.max_error = Some(vec![0.05, 1.5]);
        a.resolution = Some(vec![20.0, 0.8]);
        let update = build_update(&a).unwrap();
        assert_eq!(update.max_cell_axis_error, Some(0.05));
        assert_eq!(update.max_cell_angle_error, Some(1.5));
        assert_eq!(update.resolution, Some((20.0, 0.8)));
    }

    #[test]
    fn invalid_cell_is_rejected() {
        let mut a = args(Vec::new());
        a.cell = Some(vec![10.0, 10.0, 10.0, 90.0, 90.0, 200.0]);
        assert!(matches!(build_update(&a), Err(CliError::Argument(_))));
    }

    #[test]
    fn no_edits_is_an_argument_error() {
        let root = tempdir().unwrap();
        xds_dir(root.path(), "exp_001");
        let result = run(args(vec![root.path().to_path_buf()]), &context());
        assert!(matches!(result, Err(CliError::Argument(_))));
    }
}
