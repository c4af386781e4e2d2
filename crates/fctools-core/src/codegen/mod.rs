//! Constants file generation module.
//!
//! This module turns scanned constant definitions into the `Constants.ts`
//! source consumed by the TypeScript client library.
//!
//! ## Architecture
//!
//! 1. [`ConstantMap::seeded`] starts from the client-side `FCTYPE` values
//! 2. Scanned entries from the [`Scanner`](crate::scanner::Scanner) are merged in
//! 3. [`emit`] walks the map in a fixed order and drives an [`EnumWriter`]
//!
//! [`regenerate`] runs the whole pipeline against a [`Fetcher`].
//!
//! ## Extensibility
//!
//! The [`EnumWriter`] trait allows customization of how the file is written.
//! [`TypeScriptWriter`] produces the canonical output.

mod writer;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::json::to_pretty_string;
use crate::scanner::{ConstantEntry, ScanStrategy};
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as FmtWrite;
use tracing::{debug, info, trace, warn};

pub use writer::{EnumWriter, StatsWriter};

/// Default location of the client script that defines the constants
pub const DEFAULT_SCRIPT_URL: &str = "https://www.myfreecams.com/_js/mfccore.js";

/// Default location of the server configuration document
pub const DEFAULT_CONFIG_URL: &str = "https://www.myfreecams.com/_js/serverconfig.js";

/// Default name of the generated file
pub const DEFAULT_OUTPUT_FILE: &str = "Constants.ts";

/// Category that receives the client-side seeded values
pub const SEEDED_CATEGORY: &str = "FCTYPE";

/// Client-side `FCTYPE` values that never appear on the wire.
///
/// They are all negative so they cannot collide with a server-assigned
/// packet type.
pub const SEEDED_FCTYPES: &[(&str, i64)] = &[
    ("CLIENT_MANUAL_DISCONNECT", -6),
    ("CLIENT_DISCONNECTED", -5),
    ("CLIENT_MODELSLOADED", -4),
    ("CLIENT_CONNECTED", -3),
    ("ANY", -2),
    ("UNKNOWN", -1),
];

/// Hand-authored block written at the top of every generated file
pub const DEFAULT_HEADER: &str = r#"// Various constants and enums used by MFC.  Most of these values can be seen here:
// http://www.myfreecams.com/_js/mfccore.js

export const MAGIC = -2027771214;
export const FLASH_PORT = 8100;
export const WEBSOCKET_PORT = 443;
export const SHARE_URL = "https://share.myfreecams.com";

// STATE is essentially the same as FCVIDEO but has friendly names
// for better log messages and code readability
export enum STATE {
    FreeChat = 0,           // TX_IDLE
    // TX_RESET = 1,        // Unused?
    Away = 2,               // TX_AWAY
    // TX_CONFIRMING = 11,  // Unused?
    Private = 12,           // TX_PVT
    GroupShow = 13,         // TX_GRP
    Club = 14,              // TX_CLUB
    // TX_KILLMODEL = 15,   // Unused?
    // C2C_ON = 20,         // Unused?
    // C2C_OFF = 21,        // Unused?
    Online = 90,            // RX_IDLE
    // RX_PVT = 91,         // Unused?
    // RX_VOY = 92,         // Unused?
    // RX_GRP = 93,         // Unused?
    // RX_CLUB = 94,        // Unused?
    // NULL = 126,          // Unused?
    Offline = 127,          // OFFLINE
}

// Chat channels a model can be in.
// These are distinct from the video
// states as technically all of these
// channels exist all the time for
// every model
export enum ChannelType {
    FreeChat,
    NonFreeChat,
}

// Version number to pass along with our
// FCTYPE_LOGIN login requests
//
// The latest Flash version number is here:
//   https://www.myfreecams.com/js/wsgw.js
// The latest WebSocket version number is here:
//   http://m.myfreecams.com/source.min.js
export enum LOGIN_VERSION {
    FLASH = 20071025,
    WEBSOCKET = 20080910,
}
"#;

/// Outcome of merging one scanned entry into a [`ConstantMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// The (category, name) pair was new
    Inserted,
    /// An earlier scanned value was replaced; holds the old value
    Replaced(i64),
    /// A seeded value already owns the key and was kept; holds the seed
    KeptSeed(i64),
}

/// A value plus the position at which its key was first defined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    value: i64,
    position: usize,
}

/// Category → name → value, with seeded keys protected from scanning.
///
/// Each key remembers when it was first inserted so that entries sharing a
/// value are emitted in definition order, seeds first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantMap {
    categories: BTreeMap<String, BTreeMap<String, Slot>>,
    seeded: BTreeSet<(String, String)>,
    inserted: usize,
}

impl ConstantMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map holding the [`SEEDED_FCTYPES`]
    pub fn seeded() -> Self {
        let mut map = Self::new();
        for &(name, value) in SEEDED_FCTYPES {
            map.seed(ConstantEntry::new(SEEDED_CATEGORY, name, value));
        }
        map
    }

    /// Inserts an authoritative entry that scanning cannot override
    pub fn seed(&mut self, entry: ConstantEntry) {
        self.seeded
            .insert((entry.category.clone(), entry.name.clone()));
        let position = self.next_position();
        let names = self.categories.entry(entry.category).or_default();
        match names.entry(entry.name) {
            Entry::Vacant(slot) => {
                slot.insert(Slot {
                    value: entry.value,
                    position,
                });
            }
            Entry::Occupied(mut slot) => slot.get_mut().value = entry.value,
        }
    }

    fn next_position(&mut self) -> usize {
        self.inserted += 1;
        self.inserted
    }

    /// Merges a scanned entry.
    ///
    /// Scanned values replace earlier scanned values for the same key but
    /// never replace a seeded one.
    pub fn merge_scanned(&mut self, entry: ConstantEntry) -> Merge {
        let is_seeded = self
            .seeded
            .contains(&(entry.category.clone(), entry.name.clone()));

        let position = self.next_position();
        let names = self.categories.entry(entry.category).or_default();
        match names.entry(entry.name) {
            Entry::Vacant(slot) => {
                slot.insert(Slot {
                    value: entry.value,
                    position,
                });
                Merge::Inserted
            }
            Entry::Occupied(slot) if is_seeded => Merge::KeptSeed(slot.get().value),
            // A redefinition keeps the position of the first definition.
            Entry::Occupied(mut slot) => {
                Merge::Replaced(std::mem::replace(&mut slot.get_mut().value, entry.value))
            }
        }
    }

    /// Merges every scanned entry, logging collisions with seeded values
    pub fn extend_scanned(&mut self, entries: impl IntoIterator<Item = ConstantEntry>) {
        for entry in entries {
            let key = format!("{}_{}", entry.category, entry.name);
            let scanned = entry.value;
            match self.merge_scanned(entry) {
                Merge::Inserted => {}
                Merge::Replaced(old) => {
                    trace!("{} redefined: {} -> {}", key, old, scanned);
                }
                Merge::KeptSeed(seed) => {
                    warn!(
                        "Ignoring scanned {} = {}; keeping client-side value {}",
                        key, scanned, seed
                    );
                }
            }
        }
    }

    /// Looks up a single value
    pub fn get(&self, category: &str, name: &str) -> Option<i64> {
        self.categories.get(category)?.get(name).map(|slot| slot.value)
    }

    /// Category names in lexicographic order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Entries of `category` in ascending numeric value.
    ///
    /// Entries with equal values keep the order in which they were first
    /// defined.
    pub fn entries(&self, category: &str) -> Vec<(&str, i64)> {
        let mut slots: Vec<(&str, Slot)> = self
            .categories
            .get(category)
            .map(|names| names.iter().map(|(n, s)| (n.as_str(), *s)).collect())
            .unwrap_or_default();
        slots.sort_by_key(|&(_, slot)| (slot.value, slot.position));
        slots
            .into_iter()
            .map(|(name, slot)| (name, slot.value))
            .collect()
    }

    /// Total number of entries across all categories
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Returns true if the map holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration for constants generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Fixed block written before the generated enumerations
    pub header: String,
    /// Indentation for enumeration members (default: 4 spaces)
    pub indent_str: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            indent_str: "    ".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header block
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }
}

/// Drive `writer` through a complete constants file
pub fn emit(
    map: &ConstantMap,
    server_config_json: &str,
    header: &str,
    writer: &mut impl EnumWriter,
) -> std::fmt::Result {
    writer.write_header(header)?;
    for category in map.categories() {
        writer.write_enum(category, &map.entries(category))?;
    }
    writer.write_server_config(server_config_json)
}

/// Writes the canonical TypeScript output
pub struct TypeScriptWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a GeneratorConfig,
}

impl<'a, W: FmtWrite> TypeScriptWriter<'a, W> {
    /// Creates a writer appending to `writer`
    pub fn new(writer: &'a mut W, config: &'a GeneratorConfig) -> Self {
        Self { writer, config }
    }
}

impl<W: FmtWrite> EnumWriter for TypeScriptWriter<'_, W> {
    fn write_header(&mut self, header: &str) -> std::fmt::Result {
        self.writer.write_str(header)
    }

    fn write_enum(&mut self, category: &str, entries: &[(&str, i64)]) -> std::fmt::Result {
        writeln!(self.writer)?;
        writeln!(self.writer, "export enum {} {{", category)?;
        for (name, value) in entries {
            writeln!(
                self.writer,
                "{}\"{}\" = {},",
                self.config.indent_str, name, value
            )?;
        }
        writeln!(self.writer, "}}")
    }

    fn write_server_config(&mut self, json: &str) -> std::fmt::Result {
        writeln!(self.writer)?;
        writeln!(self.writer, "// tslint:disable:trailing-comma")?;
        writeln!(self.writer, "export const CACHED_SERVERCONFIG = {};", json)?;
        writeln!(self.writer, "// tslint:enable:trailing-comma")
    }
}

/// Renders the constants file for an already-built map
#[derive(Debug)]
pub struct ConstantsGenerator<'a> {
    map: &'a ConstantMap,
    server_config: &'a Value,
    config: GeneratorConfig,
}

impl<'a> ConstantsGenerator<'a> {
    /// Creates a generator with the default header
    pub fn new(map: &'a ConstantMap, server_config: &'a Value) -> Self {
        Self {
            map,
            server_config,
            config: GeneratorConfig::default(),
        }
    }

    /// Creates a generator with custom config
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Render the complete file as a string
    pub fn render(&self) -> Result<String> {
        let config_json = to_pretty_string(self.server_config)?;
        let mut output = String::new();
        let mut writer = TypeScriptWriter::new(&mut output, &self.config);
        emit(self.map, &config_json, &self.config.header, &mut writer)
            .expect("String write cannot fail");
        Ok(output)
    }

    /// Run an arbitrary writer over the same content
    pub fn write_with(&self, writer: &mut impl EnumWriter) -> Result<()> {
        let config_json = to_pretty_string(self.server_config)?;
        emit(self.map, &config_json, &self.config.header, writer)
            .map_err(|_| Error::internal("constants writer failed"))
    }
}

/// Where the generator pulls its inputs from
#[derive(Debug, Clone)]
pub struct Sources {
    /// URL of the client script to scan
    pub script_url: String,
    /// URL of the server configuration document
    pub config_url: String,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            config_url: DEFAULT_CONFIG_URL.to_string(),
        }
    }
}

/// Fetched and merged inputs, ready to render
#[derive(Debug, Clone)]
pub struct Regenerated {
    /// Seeded plus scanned constants
    pub map: ConstantMap,
    /// The server configuration as fetched
    pub server_config: Value,
}

impl Regenerated {
    /// Borrow a generator over these inputs
    pub fn generator(&self) -> ConstantsGenerator<'_> {
        ConstantsGenerator::new(&self.map, &self.server_config)
    }
}

/// Fetch both sources, scan the script and parse the configuration.
///
/// Any failure aborts before anything is rendered.
pub fn regenerate(
    fetcher: &dyn Fetcher,
    scanner: &dyn ScanStrategy,
    sources: &Sources,
) -> Result<Regenerated> {
    let script = fetcher.fetch_text(&sources.script_url)?;
    let scanned = scanner.scan(&script)?;
    debug!("Scanned {} constants from {}", scanned.len(), sources.script_url);

    let mut map = ConstantMap::seeded();
    map.extend_scanned(scanned);

    let config_text = fetcher.fetch_text(&sources.config_url)?;
    let server_config: Value = serde_json::from_str(&config_text).map_err(Error::ConfigParse)?;

    info!(
        "Collected {} constants in {} categories",
        map.len(),
        map.categories().count()
    );

    Ok(Regenerated { map, server_config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCRIPT: &str = "https://example.invalid/core.js";
    const CONFIG: &str = "https://example.invalid/config.js";

    fn sources() -> Sources {
        Sources {
            script_url: SCRIPT.to_string(),
            config_url: CONFIG.to_string(),
        }
    }

    fn render(script: &str, config: &str) -> Result<String> {
        let fetcher = StaticFetcher::default()
            .with(SCRIPT, script)
            .with(CONFIG, config);
        let regenerated = regenerate(&fetcher, &Scanner::new(), &sources())?;
        regenerated.generator().render()
    }

    /// Extract the body lines of `export enum <name>` from rendered output
    fn enum_body<'a>(output: &'a str, name: &str) -> Vec<&'a str> {
        let start = format!("export enum {} {{", name);
        output
            .lines()
            .skip_while(|l| *l != start)
            .skip(1)
            .take_while(|l| *l != "}")
            .collect()
    }

    fn enum_values(output: &str, name: &str) -> Vec<i64> {
        enum_body(output, name)
            .iter()
            .map(|l| l.trim_end_matches(',').rsplit(" = ").next().unwrap().parse().unwrap())
            .collect()
    }

    #[test]
    fn test_seeded_entries_without_matches() {
        let output = render("nothing to see here", "{}").unwrap();

        assert_eq!(
            enum_body(&output, "FCTYPE"),
            vec![
                "    \"CLIENT_MANUAL_DISCONNECT\" = -6,",
                "    \"CLIENT_DISCONNECTED\" = -5,",
                "    \"CLIENT_MODELSLOADED\" = -4,",
                "    \"CLIENT_CONNECTED\" = -3,",
                "    \"ANY\" = -2,",
                "    \"UNKNOWN\" = -1,",
            ]
        );
    }

    #[test]
    fn test_full_output_layout() {
        let output = render(
            "FCS.FCTYPE_LOGIN = 1; w.EVUP_FULL = 2;\nw.EVUP_NONE = 0;",
            r#"{"websocket_servers": {"xchat20": "rfc6455"}, "ajax_servers": []}"#,
        )
        .unwrap();

        let expected = format!(
            "{DEFAULT_HEADER}
export enum EVUP {{
    \"NONE\" = 0,
    \"FULL\" = 2,
}}

export enum FCTYPE {{
    \"CLIENT_MANUAL_DISCONNECT\" = -6,
    \"CLIENT_DISCONNECTED\" = -5,
    \"CLIENT_MODELSLOADED\" = -4,
    \"CLIENT_CONNECTED\" = -3,
    \"ANY\" = -2,
    \"UNKNOWN\" = -1,
    \"LOGIN\" = 1,
}}

// tslint:disable:trailing-comma
export const CACHED_SERVERCONFIG = {{
    \"ajax_servers\": [],
    \"websocket_servers\": {{
        \"xchat20\": \"rfc6455\"
    }}
}};
// tslint:enable:trailing-comma
"
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_seed_wins_over_scanned_duplicate() {
        let output = render("FCS.FCTYPE_ANY = 7;", "{}").unwrap();
        let body = enum_body(&output, "FCTYPE");

        assert!(body.contains(&"    \"ANY\" = -2,"));
        assert!(!body.contains(&"    \"ANY\" = 7,"));
    }

    #[test]
    fn test_later_scan_replaces_earlier_scan() {
        let mut map = ConstantMap::new();
        assert_eq!(
            map.merge_scanned(ConstantEntry::new("EVUP", "FULL", 2)),
            Merge::Inserted
        );
        assert_eq!(
            map.merge_scanned(ConstantEntry::new("EVUP", "FULL", 3)),
            Merge::Replaced(2)
        );
        assert_eq!(map.get("EVUP", "FULL"), Some(3));
    }

    #[test]
    fn test_merge_reports_kept_seed() {
        let mut map = ConstantMap::seeded();
        assert_eq!(
            map.merge_scanned(ConstantEntry::new("FCTYPE", "UNKNOWN", 0)),
            Merge::KeptSeed(-1)
        );
        assert_eq!(map.get("FCTYPE", "UNKNOWN"), Some(-1));
        assert_eq!(map.len(), SEEDED_FCTYPES.len());
    }

    #[test]
    fn test_entries_sorted_numerically() {
        let output = render(
            "FCS.FCACCEPT_V2_CLUBMEMBERS = 1024; FCS.FCACCEPT_ALL = 2; FCS.FCACCEPT_V2_NONE = 8; FCS.FCACCEPT_NOBODY = 0; FCS.FCACCEPT_FRIENDS = 1;",
            "{}",
        )
        .unwrap();

        assert_eq!(enum_values(&output, "FCACCEPT"), vec![0, 1, 2, 8, 1024]);
        for category in ["FCACCEPT", "FCTYPE"] {
            let values = enum_values(&output, category);
            assert!(values.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_equal_values_keep_definition_order() {
        let output = render(
            "FCS.FCCHAN_NOOPT = 0; FCS.FCCHAN_PART = 2; FCS.FCCHAN_EVENT_MUTE = 2; FCS.FCCHAN_ERR_NOCHANNEL = 2; FCS.FCCHAN_JOIN = 1;",
            "{}",
        )
        .unwrap();

        assert_eq!(
            enum_body(&output, "FCCHAN"),
            vec![
                "    \"NOOPT\" = 0,",
                "    \"JOIN\" = 1,",
                "    \"PART\" = 2,",
                "    \"EVENT_MUTE\" = 2,",
                "    \"ERR_NOCHANNEL\" = 2,",
            ]
        );
    }

    #[test]
    fn test_seeds_precede_scanned_ties() {
        let mut map = ConstantMap::seeded();
        map.extend_scanned([
            ConstantEntry::new("FCTYPE", "AARDVARK", -1),
            ConstantEntry::new("FCTYPE", "ANY", 5),
        ]);
        // A redefinition does not move the original entry
        map.extend_scanned([
            ConstantEntry::new("EVUP", "B", 1),
            ConstantEntry::new("EVUP", "A", 1),
            ConstantEntry::new("EVUP", "B", 1),
        ]);

        let fctype = map.entries("FCTYPE");
        assert_eq!(&fctype[fctype.len() - 2..], &[("UNKNOWN", -1), ("AARDVARK", -1)]);
        assert_eq!(map.entries("EVUP"), vec![("B", 1), ("A", 1)]);
    }

    #[test]
    fn test_categories_sorted() {
        let output = render("FCS.ZED_A = 1; FCS.ALPHA_A = 1; FCS.MID_A = 1;", "{}").unwrap();
        let order: Vec<&str> = output
            .lines()
            .filter_map(|l| l.strip_prefix("export enum "))
            .map(|l| l.trim_end_matches(" {"))
            .collect();

        assert_eq!(
            order,
            vec!["STATE", "ChannelType", "LOGIN_VERSION", "ALPHA", "FCTYPE", "MID", "ZED"]
        );
    }

    #[test]
    fn test_deterministic_output() {
        let script = "FCS.FCTYPE_LOGIN = 1; w.FCVIDEO_TX_IDLE = 0; FCS.FCTYPE_ZGWERROR = 95;";
        let config = r#"{"b": 1, "a": {"d": [3, 2], "c": null}}"#;

        let first = render(script, config).unwrap();
        let second = render(script, config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_config_is_fatal() {
        let err = render("FCS.FCTYPE_LOGIN = 1;", "var config = {").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_fetch_failure_is_fatal() {
        let fetcher = StaticFetcher::default().with(SCRIPT, "FCS.FCTYPE_LOGIN = 1;");
        let err = regenerate(&fetcher, &Scanner::new(), &sources()).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_stats_writer_over_generator() {
        let mut map = ConstantMap::seeded();
        map.extend_scanned([ConstantEntry::new("EVUP", "FULL", 2)]);
        let config = json!({"a": 1});

        let mut stats = StatsWriter::default();
        ConstantsGenerator::new(&map, &config)
            .write_with(&mut stats)
            .unwrap();

        assert_eq!(stats.enum_count, 2);
        assert_eq!(stats.entry_count, 7);
        assert_eq!(stats.negative_count, 6);
        assert_eq!(stats.config_bytes, "{\n    \"a\": 1\n}".len());
    }

    #[test]
    fn test_custom_header_and_indent() {
        let map = ConstantMap::new();
        let config = json!(null);
        let output = ConstantsGenerator::new(&map, &config)
            .with_config(GeneratorConfig::new().header("// generated\n").indent_str("\t"))
            .render()
            .unwrap();

        assert_eq!(
            output,
            "// generated\n\n// tslint:disable:trailing-comma\nexport const CACHED_SERVERCONFIG = null;\n// tslint:enable:trailing-comma\n"
        );
    }
}
