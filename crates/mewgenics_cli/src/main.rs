mod store;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use mewgenics_core::core_api::{CatalogConfig, CoreError, EngineConfig, RecordCatalog};
use mewgenics_core::record::DecodedRecord;
use mewgenics_render::{
    FieldSelection, JsonStyle, TextRenderOptions, render_json_collection, render_json_full,
    render_json_selected, render_regions_json, render_regions_text, render_roster_json,
    render_roster_text, render_selected_sheet,
};
use serde_json::Value as JsonValue;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::store::SqliteSource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE.sav")]
    path: PathBuf,
    /// Show only the record stored under this key.
    #[arg(long, allow_hyphen_values = true)]
    key: Option<i64>,
    /// Print the house roster instead of records.
    #[arg(long, conflicts_with_all = ["key", "regions"])]
    house: bool,
    /// List the byte ranges each locator claimed.
    #[arg(long, requires = "key")]
    regions: bool,
    /// Overrides the day counter stored in the save.
    #[arg(long = "current-day", allow_hyphen_values = true)]
    current_day: Option<i64>,
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
    #[arg(long = "cache-ttl-secs", value_name = "S")]
    cache_ttl_secs: Option<u64>,
    /// Include byte offsets in text output.
    #[arg(long)]
    offsets: bool,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long)]
    name: bool,
    #[arg(long)]
    sex: bool,
    #[arg(long)]
    class: bool,
    #[arg(long)]
    age: bool,
    #[arg(long)]
    flags: bool,
    #[arg(long)]
    stats: bool,
    #[arg(long)]
    combat: bool,
    #[arg(long)]
    mutations: bool,
    #[arg(long)]
    equipment: bool,
    #[arg(long)]
    abilities: bool,
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn field_selection(&self) -> FieldSelection {
        FieldSelection {
            name: self.name,
            sex: self.sex,
            class: self.class,
            age: self.age,
            flags: self.flags,
            stats: self.stats,
            combat: self.combat,
            mutations: self.mutations,
            equipment: self.equipment,
            abilities: self.abilities,
        }
    }

    fn catalog_config(&self) -> CatalogConfig {
        let mut config = CatalogConfig {
            engine: EngineConfig {
                worker_threads: self.threads,
            },
            ..CatalogConfig::default()
        };
        if let Some(secs) = self.cache_ttl_secs {
            config.ttl = Duration::from_secs(secs);
        }
        config
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with(context: &str, err: &CoreError) -> ! {
    eprintln!("{context}");
    eprintln!("  {err}");
    process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let fields = cli.field_selection();
    if cli.house && fields.is_any_selected() {
        eprintln!("--house cannot be combined with field flags");
        process::exit(2);
    }

    let source = SqliteSource::open(&cli.path).unwrap_or_else(|e| {
        exit_with(&format!("Error reading {}", cli.path.display()), &e);
    });
    let catalog = RecordCatalog::with_config(Arc::new(source), cli.catalog_config());

    let current_day = match cli.current_day {
        Some(day) => Some(day),
        None => catalog.current_day().unwrap_or_else(|e| {
            exit_with("Error reading current_day", &e);
        }),
    };
    debug!(?current_day, "resolved current day");

    if cli.house {
        let cats = catalog.house_cats().unwrap_or_else(|e| {
            exit_with("Error reading house roster", &e);
        });
        info!(count = cats.len(), "house roster loaded");
        if cli.json {
            print_json(&render_roster_json(&cats, JsonStyle::CanonicalV1));
        } else {
            print!("{}", render_roster_text(&cats));
        }
        return;
    }

    let options = TextRenderOptions {
        verbose: cli.offsets,
    };

    if let Some(key) = cli.key {
        let record = match catalog.get_record(key) {
            Ok(Some(record)) => record,
            Ok(None) => {
                eprintln!("No record with key {key}");
                process::exit(1);
            }
            Err(e) => exit_with(&format!("Error decoding record {key}"), &e),
        };
        if cli.json {
            print_json(&single_record_json(&record, current_day, &fields, cli.regions));
        } else {
            print!("{}", render_selected_sheet(&record, current_day, &fields, options));
            if cli.regions {
                println!();
                print!("{}", render_regions_text(&record.regions()));
            }
        }
        return;
    }

    let records = catalog.list_all().unwrap_or_else(|e| {
        exit_with("Error loading records", &e);
    });
    info!(count = records.len(), "records decoded");

    if cli.json {
        let selection = fields.is_any_selected().then_some(&fields);
        print_json(&render_json_collection(
            &records,
            current_day,
            selection,
            JsonStyle::CanonicalV1,
        ));
        return;
    }

    if records.is_empty() {
        println!("No records found.");
        return;
    }
    let sheets: Vec<String> = records
        .iter()
        .map(|record| render_selected_sheet(record, current_day, &fields, options))
        .collect();
    print!("{}", sheets.join("\n"));
}

fn single_record_json(
    record: &DecodedRecord,
    current_day: Option<i64>,
    fields: &FieldSelection,
    with_regions: bool,
) -> JsonValue {
    let mut value = if fields.is_any_selected() {
        render_json_selected(record, current_day, fields, JsonStyle::CanonicalV1)
    } else {
        render_json_full(record, current_day, JsonStyle::CanonicalV1)
    };
    if with_regions {
        if let JsonValue::Object(map) = &mut value {
            map.insert(
                "regions".to_string(),
                render_regions_json(&record.regions()),
            );
        }
    }
    value
}

fn print_json(value: &JsonValue) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error serializing JSON: {e}");
            process::exit(1);
        }
    }
}
