use std::fs;
use std::path::{Path, PathBuf};

use dataman_types::{ResultType, SimpleResult};

/// Recorded output of one trigger cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub name: String,
    pub items: Vec<(ResultType, Vec<u8>)>,
}

impl Cycle {
    /// Result items of the requested kinds, tagged with `id`
    pub fn results(&self, id: i32, requested: impl Fn(ResultType) -> bool) -> Vec<SimpleResult> {
        self.items
            .iter()
            .filter(|(result_type, _)| requested(*result_type))
            .map(|(result_type, data)| SimpleResult::new(*result_type, id, data.clone()))
            .collect()
    }
}

pub fn result_type_for(path: &Path) -> Option<ResultType> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();

    match extension.as_str() {
        "txt" => Some(ResultType::ReadString),
        "xml" => Some(ResultType::ReadXml),
        "svg" => Some(ResultType::ImageGraphics),
        "png" | "jpg" | "jpeg" | "bmp" => Some(ResultType::Image),
        _ => None,
    }
}

/// Load every cycle under `dir`, in name order. A directory without
/// sub-directories is a single cycle.
pub fn load_cycles(dir: &Path) -> std::io::Result<Vec<Cycle>> {
    let mut cycle_dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    cycle_dirs.sort();

    if cycle_dirs.is_empty() {
        cycle_dirs.push(dir.to_path_buf());
    }

    let mut cycles = Vec::with_capacity(cycle_dirs.len());
    for cycle_dir in cycle_dirs {
        let cycle = load_cycle(&cycle_dir)?;
        if cycle.items.is_empty() {
            tracing::debug!("Skipping empty cycle {}", cycle.name);
            continue;
        }
        cycles.push(cycle);
    }

    Ok(cycles)
}

fn load_cycle(dir: &Path) -> std::io::Result<Cycle> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut items = Vec::new();
    for file in files {
        match result_type_for(&file) {
            Some(result_type) => items.push((result_type, fs::read(&file)?)),
            None => tracing::debug!("Ignoring {}", file.display()),
        }
    }

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());

    Ok(Cycle { name, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_type_for_extension() {
        assert_eq!(result_type_for(Path::new("a/1.XML")), Some(ResultType::ReadXml));
        assert_eq!(result_type_for(Path::new("2.svg")), Some(ResultType::ImageGraphics));
        assert_eq!(result_type_for(Path::new("0.jpeg")), Some(ResultType::Image));
        assert_eq!(result_type_for(Path::new("read.txt")), Some(ResultType::ReadString));
        assert_eq!(result_type_for(Path::new("notes.md")), None);
        assert_eq!(result_type_for(Path::new("Makefile")), None);
    }

    #[test]
    fn test_load_cycles_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        for (cycle, file, body) in [
            ("002", "b.txt", "second"),
            ("001", "b.svg", "<svg/>"),
            ("001", "a.png", "png"),
            ("001", "c.md", "ignored"),
        ] {
            fs::create_dir_all(root.path().join(cycle)).unwrap();
            fs::write(root.path().join(cycle).join(file), body).unwrap();
        }
        fs::create_dir_all(root.path().join("003")).unwrap();

        let cycles = load_cycles(root.path()).unwrap();

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].name, "001");
        assert_eq!(
            cycles[0].items,
            vec![
                (ResultType::Image, b"png".to_vec()),
                (ResultType::ImageGraphics, b"<svg/>".to_vec()),
            ]
        );
        assert_eq!(cycles[1].items, vec![(ResultType::ReadString, b"second".to_vec())]);
    }

    #[test]
    fn test_flat_directory_is_one_cycle() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("read.xml"), "<result/>").unwrap();

        let cycles = load_cycles(root.path()).unwrap();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].items[0].0, ResultType::ReadXml);
    }

    #[test]
    fn test_results_filter_by_request() {
        let cycle = Cycle {
            name: "001".to_string(),
            items: vec![
                (ResultType::Image, vec![1]),
                (ResultType::ReadString, b"ABC".to_vec()),
            ],
        };

        let results = cycle.results(12, |t| t == ResultType::ReadString);

        assert_eq!(results, vec![SimpleResult::new(ResultType::ReadString, 12, "ABC")]);
    }
}
