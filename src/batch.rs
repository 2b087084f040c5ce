//! File collection and parallel conversion used by the command line tools.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

fn should_skip(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    patterns.iter().any(|p| path_str.contains(p))
}

/// Files under `path` with one of `extensions` (case insensitive).
///
/// A file path is returned as is, without checking its extension.
pub fn collect_files(path: &Path, extensions: &[&str], skip_patterns: &[String]) -> Vec<PathBuf> {
    if path.is_file() {
        if should_skip(path, skip_patterns) {
            vec![]
        } else {
            vec![path.to_path_buf()]
        }
    } else {
        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
                extensions.iter().any(|x| x.eq_ignore_ascii_case(ext))
            })
            .filter(|p| !should_skip(p, skip_patterns))
            .collect();
        files.sort();
        files
    }
}

/// Output path built by appending `suffix` to the full input file name,
/// e.g. `wood.gltf` becomes `wood.gltf_converted.mtlx`.
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Outcome of converting a set of files.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Input and written output of every successful conversion
    pub converted: Vec<(PathBuf, PathBuf)>,
    /// Input and error message of every failed conversion
    pub failures: Vec<(PathBuf, String)>,
    pub elapsed_secs: f64,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.converted.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Print the summary, with paths relative to `root`.
    pub fn print(&self, root: &Path, verbose: bool) {
        println!();
        println!("================================================================================");
        println!("Conversion Summary");
        println!("================================================================================");
        println!();

        let total = self.total();
        let pct = |count: usize| {
            if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            }
        };
        println!("Total files:  {}", total);
        println!("Converted:    {} ({:.1}%)", self.converted.len(), pct(self.converted.len()));
        println!("Failed:       {} ({:.1}%)", self.failures.len(), pct(self.failures.len()));
        println!();

        if verbose {
            println!("Converted files:");
            for (input, output) in &self.converted {
                let rel_input = input.strip_prefix(root).unwrap_or(input);
                println!("  - {} -> {}", rel_input.display(), output.display());
            }
            println!();
        }

        if !self.failures.is_empty() {
            println!("Failed files:");
            for (path, error) in &self.failures {
                let rel_path = path.strip_prefix(root).unwrap_or(path);
                println!("  - {}", rel_path.display());
                println!("    {}", error);
            }
            println!();
        }

        println!("Time elapsed: {:.2}s", self.elapsed_secs);
    }
}

/// Run `convert` over `files` in parallel.
///
/// `convert` returns the path written for an input. A progress bar is shown
/// when `show_progress` is set.
pub fn run_batch<F>(files: &[PathBuf], show_progress: bool, convert: F) -> BatchSummary
where
    F: Fn(&Path) -> Result<PathBuf> + Sync,
{
    let start = Instant::now();

    let progress = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let converted: Mutex<Vec<(PathBuf, PathBuf)>> = Mutex::new(Vec::new());
    let failures: Mutex<Vec<(PathBuf, String)>> = Mutex::new(Vec::new());

    files.par_iter().for_each(|file| {
        let result = convert(file);

        if let Some(ref pb) = progress {
            pb.inc(1);
        }

        match result {
            Ok(output) => {
                log::debug!("Converted {} to {}", file.display(), output.display());
                if let Ok(mut converted) = converted.lock() {
                    converted.push((file.clone(), output));
                }
            }
            Err(err) => {
                log::debug!("Failed to convert {}: {:#}", file.display(), err);
                if let Ok(mut failures) = failures.lock() {
                    failures.push((file.clone(), format!("{:#}", err)));
                }
            }
        }
    });

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let mut summary = BatchSummary {
        converted: converted.into_inner().unwrap_or_default(),
        failures: failures.into_inner().unwrap_or_default(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    summary.converted.sort();
    summary.failures.sort();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.gltf"), "{}").unwrap();
        std::fs::write(dir.path().join("nested/b.GLB"), "").unwrap();
        std::fs::write(dir.path().join("nested/skip_me.gltf"), "{}").unwrap();
        std::fs::write(dir.path().join("c.mtlx"), "").unwrap();

        let files = collect_files(dir.path(), &["gltf", "glb"], &["skip_me".to_string()]);
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.gltf", "b.GLB"]);

        let single = collect_files(&dir.path().join("c.mtlx"), &["gltf"], &[]);
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("dir/wood.gltf"), "_converted.mtlx"),
            PathBuf::from("dir/wood.gltf_converted.mtlx")
        );
        assert_eq!(output_path(Path::new("brass.mtlx"), ".gltf"), PathBuf::from("brass.mtlx.gltf"));
    }

    #[test]
    fn test_run_batch() {
        let files = vec![PathBuf::from("ok_1"), PathBuf::from("bad"), PathBuf::from("ok_2")];
        let summary = run_batch(&files, false, |path| {
            if path.to_string_lossy().starts_with("ok") {
                Ok(path.with_extension("out"))
            } else {
                anyhow::bail!("cannot convert {}", path.display())
            }
        });

        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
        assert_eq!(summary.converted[0], (PathBuf::from("ok_1"), PathBuf::from("ok_1.out")));
        assert_eq!(summary.failures, vec![(PathBuf::from("bad"), "cannot convert bad".to_string())]);
    }
}
