//! Delimited text tables of voxel records.
//!
//! ```text
//! x,y,z,r,g,b,variance
//! 0.0000000000,1.0000000000,-2.0000000000,0.5000000000,0.2500000000,1.0000000000,0.0012500000
//! ```
//!
//! The first row is always the header; coordinates are integer grid indices
//! written as fixed-point numbers; colors are on the [0, 1] scale.

use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::color::Rgb;
use crate::error::{Result, VoxelError};
use crate::faces::OccupancySet;
use crate::grid::GridIndex;
use crate::voxelize::{VoxelGrid, VoxelRecord};

/// Fractional digits of every written value.
pub const PRECISION: usize = 10;

const COLOR_HEADER: [&str; 6] = ["x", "y", "z", "r", "g", "b"];
const VARIANCE_HEADER: [&str; 7] = ["x", "y", "z", "r", "g", "b", "variance"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSchema {
    /// `x,y,z,r,g,b`
    Color,
    /// `x,y,z,r,g,b,variance`
    ColorVariance,
}

impl TableSchema {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            TableSchema::Color => &COLOR_HEADER,
            TableSchema::ColorVariance => &VARIANCE_HEADER,
        }
    }

    pub fn columns(self) -> usize {
        self.header().len()
    }

    fn from_header(fields: &[&str]) -> Option<Self> {
        [TableSchema::Color, TableSchema::ColorVariance]
            .into_iter()
            .find(|schema| schema.header() == fields)
    }
}

/// Records read back from a table.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelTable {
    pub schema: TableSchema,
    pub records: Vec<VoxelRecord>,
}

impl VoxelTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn occupancy(&self) -> OccupancySet {
        self.records.iter().map(|r| r.index).collect()
    }

    pub fn colors(&self) -> Vec<Rgb> {
        self.records.iter().map(|r| r.color).collect()
    }
}

fn fixed(value: f64) -> String {
    format!("{:.*}", PRECISION, value)
}

/// Write `records` with an explicit header row. Records without a variance
/// are written as `0` under the variance schema.
pub fn write_table<W: Write>(writer: W, records: &[VoxelRecord], schema: TableSchema) -> Result<()> {
    write_rows(writer, records, schema).map_err(|e| VoxelError::data(format!("writing table: {}", e)))
}

fn write_rows<W: Write>(writer: W, records: &[VoxelRecord], schema: TableSchema) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(schema.header())?;

    let mut row: Vec<String> = Vec::with_capacity(schema.columns());
    for record in records {
        row.clear();
        let i = record.index;
        row.extend([i.x as f64, i.y as f64, i.z as f64].map(fixed));
        row.extend(record.color.to_array().map(fixed));
        if schema == TableSchema::ColorVariance {
            row.push(fixed(record.variance.unwrap_or(0.0)));
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a grid to `path` using the schema matching its resolution mode.
pub fn save_table(path: impl AsRef<Path>, grid: &VoxelGrid) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| VoxelError::resource(path, e))?;
    write_rows(BufWriter::new(file), grid.records(), grid.schema())
        .map_err(|e| VoxelError::resource(path, e))
}

pub fn read_table<R: Read>(reader: R) -> Result<VoxelTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = rdr.records();
    let header = match rows.next() {
        Some(row) => row.map_err(|e| VoxelError::data(format!("cannot read header: {}", e)))?,
        None => return Err(VoxelError::data("voxel table is empty (missing header)")),
    };
    let fields: Vec<&str> = header.iter().collect();
    let schema = TableSchema::from_header(&fields).ok_or_else(|| {
        VoxelError::data(format!(
            "unrecognized voxel table header '{}' (expected '{}' or '{}')",
            fields.join(","),
            COLOR_HEADER.join(","),
            VARIANCE_HEADER.join(",")
        ))
    })?;

    let mut records = Vec::new();
    let mut seen: FxHashSet<GridIndex> = FxHashSet::default();

    for row in rows {
        let row = row.map_err(|e| VoxelError::data(e.to_string()))?;
        let line = row.position().map_or(0, |p| p.line());
        if row.len() != schema.columns() {
            return Err(VoxelError::data(format!(
                "line {}: expected {} columns, found {}",
                line,
                schema.columns(),
                row.len()
            )));
        }

        let mut values = [0.0f64; 7];
        for (slot, (field, name)) in values.iter_mut().zip(row.iter().zip(schema.header())) {
            *slot = parse_number(field, name, line)?;
        }

        let index = GridIndex::new(
            parse_coordinate(values[0], "x", line)?,
            parse_coordinate(values[1], "y", line)?,
            parse_coordinate(values[2], "z", line)?,
        );
        if !seen.insert(index) {
            return Err(VoxelError::data(format!(
                "line {}: duplicate voxel {}",
                line, index
            )));
        }

        let mut record = VoxelRecord::new(index, Rgb::new(values[3], values[4], values[5]));
        if schema == TableSchema::ColorVariance {
            record.variance = Some(values[6]);
        }
        records.push(record);
    }

    Ok(VoxelTable { schema, records })
}

pub fn load_table(path: impl AsRef<Path>) -> Result<VoxelTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| VoxelError::resource(path, e))?;
    read_table(BufReader::new(file))
}

fn parse_number(field: &str, column: &str, line: u64) -> Result<f64> {
    let value: f64 = field.parse().map_err(|_| {
        VoxelError::data(format!(
            "line {}: column {} is not a number: '{}'",
            line, column, field
        ))
    })?;
    if !value.is_finite() {
        return Err(VoxelError::data(format!(
            "line {}: column {} is not finite",
            line, column
        )));
    }
    Ok(value)
}

fn parse_coordinate(value: f64, column: &str, line: u64) -> Result<i32> {
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(VoxelError::data(format!(
            "line {}: coordinate {} = {} is not a grid index",
            line, column, value
        )));
    }
    Ok(value as i32)
}
