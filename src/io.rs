//! CSV input and output.
//!
//! Input points use the `{x, y, z}` line format of the upstream design
//! tools, braces optional and z defaulting to 0. All numbers parse and
//! print in the C locale; floats print in Rust's shortest round-tripping
//! form. Read or parse failures always name the offending path.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::DVec3;

use crate::optim::Individual;
use crate::shadow::LightGrid;

/// Load `{x, y, z}` points, one per line. Blank lines are skipped; a
/// missing third coordinate defaults to 0.
pub fn load_points(path: &Path) -> Result<Vec<DVec3>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        let body = line.trim().trim_start_matches('{').trim_end_matches('}');
        if body.is_empty() {
            continue;
        }
        let fields: Vec<&str> = body.split(',').map(str::trim).collect();
        if fields.len() < 2 || fields.len() > 3 {
            bail!(
                "{}:{}: expected 2 or 3 coordinates, found {}",
                path.display(),
                idx + 1,
                fields.len()
            );
        }
        let x = parse_float(fields[0], path, idx)?;
        let y = parse_float(fields[1], path, idx)?;
        let z = if fields.len() == 3 {
            parse_float(fields[2], path, idx)?
        } else {
            0.0
        };
        out.push(DVec3::new(x, y, z));
    }
    Ok(out)
}

/// Load one scalar factor per line. Blank lines are skipped.
pub fn load_factors(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        let body = line.trim();
        if body.is_empty() {
            continue;
        }
        out.push(parse_float(body, path, idx)?);
    }
    Ok(out)
}

fn parse_float(field: &str, path: &Path, line_idx: usize) -> Result<f64> {
    field
        .parse::<f64>()
        .with_context(|| format!("{}:{}: invalid number {:?}", path.display(), line_idx + 1, field))
}

/// Write a curve as `{x, y, z}` lines. No trailing newline after the last
/// point.
pub fn write_curve(path: &Path, points: &[DVec3]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        write!(w, "{{{}, {}, {}}}", p.x, p.y, p.z)?;
    }
    w.flush()
        .with_context(|| format!("write {}", path.display()))
}

/// Write a light-hours grid as alternating lines: the cell center
/// `{x, y, 0.0}` followed by its integer hour count, row-major.
pub fn write_lighting(path: &Path, grid: &LightGrid) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let c = grid.center(col, row);
            writeln!(w, "{{{}, {}, 0.0}}", c.x, c.y)?;
            writeln!(w, "{}", grid.hours(col, row))?;
        }
    }
    w.flush()
        .with_context(|| format!("write {}", path.display()))
}

/// Write one generation's Pareto front: header `f0,..,g0,..`, one
/// individual per line, objectives before genes.
pub fn write_front_csv(path: &Path, front: &[&Individual]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);

    let (objectives, genes) = match front.first() {
        Some(ind) => (ind.objectives.len(), ind.genes.len()),
        None => (0, 0),
    };
    let header: Vec<String> = (0..objectives)
        .map(|i| format!("f{}", i))
        .chain((0..genes).map(|i| format!("g{}", i)))
        .collect();
    writeln!(w, "{}", header.join(","))?;

    for ind in front {
        let fields: Vec<String> = ind
            .objectives
            .iter()
            .chain(ind.genes.iter())
            .map(|v| v.to_string())
            .collect();
        writeln!(w, "{}", fields.join(","))?;
    }
    w.flush()
        .with_context(|| format!("write {}", path.display()))
}

/// Write the best individual's genes as one comma-separated line.
pub fn write_best_genes_csv(path: &Path, genes: &[f64]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    let fields: Vec<String> = genes.iter().map(|v| v.to_string()).collect();
    write!(w, "{}", fields.join(","))?;
    w.flush()
        .with_context(|| format!("write {}", path.display()))
}
