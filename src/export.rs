//! Tab-separated artifacts for one finished run.
//!
//! Layout under `<export_dir>/run_<id>/`, every file headerless:
//!
//! | File | Columns |
//! |---|---|
//! | `entity2id.txt`, `relation2id.txt` | name, id, weight |
//! | `timestamp2id.txt` | name, id |
//! | `pattern2id.txt` | label, n_hops, id |
//! | `stat.txt` | entity count, relation count, `0` |
//! | `train.txt`, `valid.txt`, `test.txt` | head, rel, tail, t, weight, pattern ids |
//!
//! Pattern ids render as `[-1, 0, 3]`, where `-1` marks a fact that was
//! emitted as noise. The effective configuration is saved as `config.toml`.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::GeneratorConfig;
use crate::error::{ExportError, ExportResult, SynthResult};
use crate::generate::RunOutput;
use crate::graph::store::{Fact, FactStore};
use crate::split::temporal_split;
use crate::symbol::SymbolTable;

/// Pattern id written for noise facts.
pub const NOISE_PATTERN_ID: i64 = -1;

/// Directory that run `run_id` exports into.
pub fn run_dir(export_dir: &Path, run_id: usize) -> PathBuf {
    export_dir.join(format!("run_{run_id}"))
}

/// The pattern-id column of a fact, e.g. `[-1, 0, 3]` or `[]`.
pub fn pattern_list(fact: &Fact) -> String {
    let ids: Vec<String> = fact
        .noise
        .then_some(NOISE_PATTERN_ID)
        .into_iter()
        .chain(fact.pattern_ids.iter().map(|id| i64::from(id.get())))
        .map(|id| id.to_string())
        .collect();
    format!("[{}]", ids.join(", "))
}

/// One row of a fact file.
pub fn fact_line(fact: &Fact) -> String {
    let Fact {
        triple, timestamp, weight, ..
    } = fact;
    format!(
        "{}\t{}\t{}\t{timestamp}\t{weight}\t{}",
        triple.head,
        triple.relation,
        triple.tail,
        pattern_list(fact)
    )
}

/// Write every artifact of `output` under `export_dir` and return the run
/// directory.
pub fn export_run(
    output: &RunOutput,
    config: &GeneratorConfig,
    export_dir: &Path,
) -> SynthResult<PathBuf> {
    let dir = run_dir(export_dir, output.run_id);
    std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;

    write_symbols(&dir.join("entity2id.txt"), &output.entities)?;
    write_symbols(&dir.join("relation2id.txt"), &output.relations)?;
    write_lines(
        &dir.join("timestamp2id.txt"),
        (0..output.n_tws).map(|t| format!("{t}\t{t}")),
    )?;
    write_lines(
        &dir.join("pattern2id.txt"),
        output
            .patterns
            .iter()
            .map(|(id, p)| format!("{}\t{}\t{id}", p.label(), p.n_hops)),
    )?;
    let stat = dir.join("stat.txt");
    std::fs::write(
        &stat,
        format!("{}\t{}\t0", output.entities.len(), output.relations.len()),
    )
    .map_err(|e| io_error(&stat, e))?;

    let split = temporal_split(&output.store, &config.split)?;
    let sets = [("train", &split.train), ("valid", &split.valid), ("test", &split.test)];
    for (name, idxs) in sets {
        write_facts(&dir.join(format!("{name}.txt")), &output.store, idxs)?;
    }

    let toml = config.to_toml().map_err(|e| ExportError::Serialize {
        what: "config".into(),
        message: e.to_string(),
    })?;
    let config_path = dir.join("config.toml");
    std::fs::write(&config_path, toml).map_err(|e| io_error(&config_path, e))?;

    tracing::info!(
        run_id = output.run_id,
        dir = %dir.display(),
        train = split.train.len(),
        valid = split.valid.len(),
        test = split.test.len(),
        "exported run"
    );
    Ok(dir)
}

fn write_symbols(path: &Path, table: &SymbolTable) -> ExportResult<()> {
    tracing::debug!(kind = %table.kind(), n = table.len(), path = %path.display(), "writing ids");
    write_lines(
        path,
        table
            .rows()
            .iter()
            .map(|row| format!("{}\t{}\t{}", row.name, row.id, row.weight)),
    )
}

fn write_facts(path: &Path, store: &FactStore, idxs: &[usize]) -> ExportResult<()> {
    write_lines(
        path,
        idxs.iter().filter_map(|&i| store.get(i)).map(fact_line),
    )
}

fn write_lines<I, S>(path: &Path, lines: I) -> ExportResult<()>
where
    I: IntoIterator<Item = S>,
    S: Display,
{
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut out = BufWriter::new(file);
    for line in lines {
        writeln!(out, "{line}").map_err(|e| io_error(path, e))?;
    }
    out.flush().map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Triple;
    use crate::symbol::PatternId;

    #[test]
    fn pattern_list_rendering() {
        let mut fact = Fact::noise(Triple::from_raw(1, 0, 2), 3);
        assert_eq!(pattern_list(&fact), "[-1]");
        fact.pattern_ids.insert(PatternId(3));
        fact.pattern_ids.insert(PatternId(0));
        assert_eq!(pattern_list(&fact), "[-1, 0, 3]");
        assert_eq!(pattern_list(&Fact::new(Triple::from_raw(1, 0, 2), 3)), "[]");
    }

    #[test]
    fn fact_line_columns() {
        let mut fact = Fact::new(Triple::from_raw(4, 1, 7), 2);
        fact.weight = 3;
        fact.pattern_ids.insert(PatternId(5));
        assert_eq!(fact_line(&fact), "4\t1\t7\t2\t3\t[5]");
    }

    #[test]
    fn run_dir_naming() {
        assert_eq!(run_dir(Path::new("out"), 3), PathBuf::from("out/run_3"));
    }
}
