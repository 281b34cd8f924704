use clap::{Parser, Subcommand};
use geojson::{JsonObject, JsonValue};
use geomongo_core::models::Bbox;
use std::path::PathBuf;

/// geomongo - Shapefile to MongoDB importer
#[derive(Parser, Debug)]
#[command(name = "geomongo")]
#[command(about = "Import shapefiles into MongoDB collections with 2dsphere indexes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./geomongo.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// MongoDB connection string
    #[arg(long, global = true, value_name = "URI")]
    pub uri: Option<String>,

    /// Database receiving the collections
    #[arg(long, global = true, value_name = "NAME")]
    pub database: Option<String>,

    /// Command to run (import when omitted)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import every configured dataset into its collection
    Import(ImportArgs),

    /// Query a collection by bounding box or point
    Query(QueryArgs),

    /// Show the geometry type of a collection and the active configuration
    Inspect(InspectArgs),
}

#[derive(Parser, Debug, Default)]
pub struct ImportArgs {
    /// Directory holding <dataset>.shp/.shx/.dbf
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Comma separated dataset names (e.g. points,linestrings,polygons)
    #[arg(long, value_name = "NAMES")]
    pub datasets: Option<String>,
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Collection to query
    pub collection: String,

    /// Bounding box as minx,miny,maxx,maxy
    #[arg(
        long,
        value_name = "MINX,MINY,MAXX,MAXY",
        allow_hyphen_values = true,
        conflicts_with = "point",
        required_unless_present = "point"
    )]
    pub bbox: Option<Bbox>,

    /// Point as x,y
    #[arg(long, value_name = "X,Y", allow_hyphen_values = true, value_parser = parse_point)]
    pub point: Option<(f64, f64)>,

    /// Half-size in degrees of the box around --point
    #[arg(long, default_value_t = 0.001)]
    pub tolerance: f64,

    /// The geometry field carries a flat 2d index instead of 2dsphere
    #[arg(long)]
    pub flat_index: bool,

    /// Extra JSON conditions, e.g. '{"properties.kind":"cafe"}'
    #[arg(long, value_name = "JSON", value_parser = parse_filter)]
    pub filter: Option<JsonObject>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Collection to inspect
    pub collection: String,
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid point '{}': expected x,y", s))?;

    match values.as_slice() {
        [x, y] => Ok((*x, *y)),
        _ => Err(format!("invalid point '{}': expected x,y", s)),
    }
}

fn parse_filter(s: &str) -> Result<JsonObject, String> {
    match serde_json::from_str::<JsonValue>(s) {
        Ok(JsonValue::Object(object)) => Ok(object),
        Ok(_) => Err("filter must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON filter: {}", e)),
    }
}
