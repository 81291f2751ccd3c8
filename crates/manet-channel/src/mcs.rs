//! MCS (modulation and coding scheme) table and SNR-based selection with
//! per-link hysteresis (C2, C7, C12).
//!
//! The CSV loader (§6.5) is core, not CLI config parsing: the original
//! implementation keeps it alongside the selection logic rather than in its
//! command-line entry point, and this crate does the same.

use crate::modulation::{bits_per_symbol, spectral_efficiency};
use manet_types::{ConfigError, FecType, LinkId, ModulationScheme};
use std::collections::HashMap;
use std::io::Read;

/// One row of an MCS table. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McsEntry {
    pub mcs_index: u32,
    pub modulation: ModulationScheme,
    pub code_rate: f64,
    pub min_snr_db: f64,
    pub fec_type: FecType,
    pub bits_per_symbol: u32,
    pub bandwidth_mhz: Option<f64>,
}

impl McsEntry {
    pub fn new(
        mcs_index: u32,
        modulation: ModulationScheme,
        code_rate: f64,
        min_snr_db: f64,
        fec_type: FecType,
    ) -> Self {
        McsEntry {
            mcs_index,
            modulation,
            code_rate,
            min_snr_db,
            fec_type,
            bits_per_symbol: bits_per_symbol(modulation),
            bandwidth_mhz: None,
        }
    }

    pub fn spectral_efficiency(&self) -> f64 {
        spectral_efficiency(self.modulation, self.code_rate)
    }
}

fn parse_modulation(tag: &str) -> Result<ModulationScheme, ConfigError> {
    match tag.to_lowercase().as_str() {
        "bpsk" => Ok(ModulationScheme::Bpsk),
        "qpsk" => Ok(ModulationScheme::Qpsk),
        "16qam" => Ok(ModulationScheme::Qam16),
        "64qam" => Ok(ModulationScheme::Qam64),
        "256qam" => Ok(ModulationScheme::Qam256),
        "1024qam" => Ok(ModulationScheme::Qam1024),
        other => Err(ConfigError::UnknownModulation(other.to_string())),
    }
}

fn parse_fec(tag: &str) -> Result<FecType, ConfigError> {
    match tag.to_lowercase().as_str() {
        "none" => Ok(FecType::None),
        "ldpc" => Ok(FecType::Ldpc),
        "polar" => Ok(FecType::Polar),
        "turbo" => Ok(FecType::Turbo),
        other => Err(ConfigError::UnknownFec(other.to_string())),
    }
}

#[derive(Debug, serde::Deserialize)]
struct McsCsvRow {
    mcs_index: u32,
    modulation: String,
    code_rate: f64,
    min_snr_db: f64,
    #[serde(default)]
    fec_type: Option<String>,
    #[serde(default)]
    bandwidth_mhz: Option<f64>,
}

impl McsEntry {
    fn from_csv_row(row: McsCsvRow) -> Result<Self, ConfigError> {
        let modulation = parse_modulation(&row.modulation)?;
        let fec_type = match row.fec_type {
            Some(f) => parse_fec(&f)?,
            None => FecType::Ldpc,
        };
        Ok(McsEntry {
            mcs_index: row.mcs_index,
            modulation,
            code_rate: row.code_rate,
            min_snr_db: row.min_snr_db,
            fec_type,
            bits_per_symbol: bits_per_symbol(modulation),
            bandwidth_mhz: row.bandwidth_mhz,
        })
    }
}

/// An ordered-by-min-SNR MCS table plus per-link hysteresis state (§3).
#[derive(Debug, Clone)]
pub struct McsTable {
    entries: Vec<McsEntry>,
    pub hysteresis_db: f64,
    current: HashMap<LinkId, usize>,
}

impl McsTable {
    /// Construct from entries, sorting ascending by `min_snr_db`.
    /// `entries` must be non-empty.
    pub fn new(mut entries: Vec<McsEntry>, hysteresis_db: f64) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyMcsTable);
        }
        entries.sort_by(|a, b| a.min_snr_db.partial_cmp(&b.min_snr_db).unwrap());
        Ok(McsTable {
            entries,
            hysteresis_db,
            current: HashMap::new(),
        })
    }

    /// Load from CSV text (§6.5): `mcs_index, modulation, code_rate,
    /// min_snr_db, fec_type[, bandwidth_mhz]`. Sorts ascending and rejects
    /// an empty table.
    pub fn from_csv_reader<R: Read>(reader: R, hysteresis_db: f64) -> Result<Self, ConfigError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let row: McsCsvRow = result.map_err(|e| ConfigError::McsTableLoad(e.to_string()))?;
            entries.push(McsEntry::from_csv_row(row)?);
        }
        Self::new(entries, hysteresis_db)
    }

    pub fn entries(&self) -> &[McsEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false // invariant: never empty after construction
    }

    pub fn min_mcs(&self) -> &McsEntry {
        &self.entries[0]
    }

    pub fn max_mcs(&self) -> &McsEntry {
        &self.entries[self.entries.len() - 1]
    }

    pub fn get_by_index(&self, mcs_index: u32) -> Option<&McsEntry> {
        self.entries.iter().find(|e| e.mcs_index == mcs_index)
    }

    /// Position in `entries` (not `mcs_index`) of the entry `select_mcs`
    /// would pick ignoring hysteresis: the highest-indexed entry whose
    /// `min_snr_db <= snr_db`, or the first entry if `snr_db` is below all
    /// thresholds. Ties (equal `min_snr_db`) resolve to the later entry
    /// (§4.7 tie-break: higher spectral efficiency wins).
    fn base_select_position(&self, snr_db: f64) -> usize {
        let mut pos = 0;
        for (i, e) in self.entries.iter().enumerate() {
            if e.min_snr_db <= snr_db {
                pos = i;
            } else {
                break;
            }
        }
        pos
    }

    /// Select an MCS entry for `snr_db`. With `link_id`, applies hysteresis
    /// against that link's previously selected entry (§4.2 step 2); without
    /// one, selection is purely SNR-based with no state.
    pub fn select_mcs(&mut self, snr_db: f64, link_id: Option<&LinkId>) -> &McsEntry {
        let base_pos = self.base_select_position(snr_db);
        let Some(link_id) = link_id else {
            return &self.entries[base_pos];
        };

        let cur = *self.current.get(link_id).unwrap_or(&base_pos);
        let new_pos = match base_pos.cmp(&cur) {
            std::cmp::Ordering::Greater => {
                if snr_db >= self.entries[base_pos].min_snr_db + self.hysteresis_db {
                    base_pos
                } else {
                    cur
                }
            }
            std::cmp::Ordering::Less => {
                if snr_db < self.entries[cur].min_snr_db - self.hysteresis_db {
                    base_pos
                } else {
                    cur
                }
            }
            std::cmp::Ordering::Equal => cur,
        };
        self.current.insert(link_id.clone(), new_pos);
        &self.entries[new_pos]
    }

    /// Clears hysteresis state for one link.
    pub fn reset_link_state(&mut self, link_id: &LinkId) {
        self.current.remove(link_id);
    }

    /// Clears hysteresis state for every link. Must be called at the start
    /// of every batch recompute (§4.2 step 3, §4.11).
    pub fn reset_all_link_states(&mut self) {
        self.current.clear();
    }
}

impl std::fmt::Display for McsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MCSTable({} entries, hysteresis={})",
            self.entries.len(),
            self.hysteresis_db
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> McsTable {
        let entries = vec![
            McsEntry::new(0, ModulationScheme::Bpsk, 0.5, 5.0, FecType::Ldpc),
            McsEntry::new(1, ModulationScheme::Qpsk, 0.5, 8.0, FecType::Ldpc),
            McsEntry::new(2, ModulationScheme::Qpsk, 0.75, 11.0, FecType::Ldpc),
            McsEntry::new(3, ModulationScheme::Qam16, 0.5, 14.0, FecType::Ldpc),
            McsEntry::new(4, ModulationScheme::Qam16, 0.75, 17.0, FecType::Ldpc),
            McsEntry::new(5, ModulationScheme::Qam64, 0.5, 20.0, FecType::Ldpc),
            McsEntry::new(6, ModulationScheme::Qam64, 0.75, 23.0, FecType::Ldpc),
            McsEntry::new(7, ModulationScheme::Qam256, 0.5, 26.0, FecType::Ldpc),
            McsEntry::new(8, ModulationScheme::Qam256, 0.75, 30.0, FecType::Ldpc),
            McsEntry::new(9, ModulationScheme::Qam1024, 0.75, 35.0, FecType::Ldpc),
        ];
        McsTable::new(entries, 2.0).unwrap()
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            McsTable::new(vec![], 2.0),
            Err(ConfigError::EmptyMcsTable)
        ));
    }

    #[test]
    fn select_lowest_below_all_thresholds() {
        let mut table = test_table();
        assert_eq!(table.select_mcs(3.0, None).mcs_index, 0);
    }

    #[test]
    fn select_highest_above_all_thresholds() {
        let mut table = test_table();
        assert_eq!(table.select_mcs(40.0, None).mcs_index, 9);
    }

    #[test]
    fn select_at_various_snr_levels() {
        let mut table = test_table();
        let cases = [
            (5.0, 0),
            (7.5, 0),
            (8.0, 1),
            (10.5, 1),
            (14.0, 3),
            (20.0, 5),
            (25.0, 6),
            (35.0, 9),
        ];
        for (snr, expected) in cases {
            assert_eq!(table.select_mcs(snr, None).mcs_index, expected, "snr={snr}");
        }
    }

    #[test]
    fn no_hysteresis_without_link_id() {
        let mut table = test_table();
        assert_eq!(table.select_mcs(23.0, None).mcs_index, 6);
        assert_eq!(table.select_mcs(22.9, None).mcs_index, 5);
    }

    #[test]
    fn upgrade_requires_hysteresis_margin() {
        let mut table = test_table();
        let link = LinkId::new("n1", "a", "n2", "b");
        assert_eq!(table.select_mcs(20.0, Some(&link)).mcs_index, 5);
        assert_eq!(table.select_mcs(24.0, Some(&link)).mcs_index, 5);
        assert_eq!(table.select_mcs(25.0, Some(&link)).mcs_index, 6);
    }

    #[test]
    fn downgrade_allows_hysteresis_margin() {
        let mut table = test_table();
        let link = LinkId::new("n1", "a", "n2", "b");
        assert_eq!(table.select_mcs(25.0, Some(&link)).mcs_index, 6);
        assert_eq!(table.select_mcs(21.5, Some(&link)).mcs_index, 6);
        assert_eq!(table.select_mcs(20.5, Some(&link)).mcs_index, 5);
    }

    #[test]
    fn different_links_have_independent_hysteresis() {
        let mut table = test_table();
        let link1 = LinkId::new("n1", "a", "n2", "b");
        let link2 = LinkId::new("n3", "a", "n4", "b");
        assert_eq!(table.select_mcs(20.0, Some(&link1)).mcs_index, 5);
        assert_eq!(table.select_mcs(30.0, Some(&link2)).mcs_index, 8);
        assert_eq!(table.select_mcs(20.0, Some(&link1)).mcs_index, 5);
        assert_eq!(table.select_mcs(30.0, Some(&link2)).mcs_index, 8);
    }

    #[test]
    fn reset_link_state_clears_hysteresis_for_one_link() {
        let mut table = test_table();
        let link = LinkId::new("n1", "a", "n2", "b");
        assert_eq!(table.select_mcs(20.0, Some(&link)).mcs_index, 5);
        table.reset_link_state(&link);
        assert_eq!(table.select_mcs(24.0, Some(&link)).mcs_index, 6);
    }

    #[test]
    fn reset_all_link_states_clears_every_link() {
        let mut table = test_table();
        table.select_mcs(20.0, Some(&LinkId::new("n1", "a", "n2", "b")));
        table.select_mcs(25.0, Some(&LinkId::new("n3", "a", "n4", "b")));
        table.reset_all_link_states();
        assert!(table.current.is_empty());
    }

    #[test]
    fn zero_hysteresis_switches_immediately() {
        let entries = vec![
            McsEntry::new(0, ModulationScheme::Bpsk, 0.5, 5.0, FecType::Ldpc),
            McsEntry::new(1, ModulationScheme::Qpsk, 0.5, 10.0, FecType::Ldpc),
        ];
        let mut table = McsTable::new(entries, 0.0).unwrap();
        let link = LinkId::new("n1", "a", "n2", "b");
        assert_eq!(table.select_mcs(5.0, Some(&link)).mcs_index, 0);
        assert_eq!(table.select_mcs(10.0, Some(&link)).mcs_index, 1);
    }

    #[test]
    fn min_max_and_get_by_index() {
        let table = test_table();
        assert_eq!(table.min_mcs().mcs_index, 0);
        assert_eq!(table.max_mcs().mcs_index, 9);
        assert_eq!(table.get_by_index(5).unwrap().modulation, ModulationScheme::Qam64);
        assert!(table.get_by_index(99).is_none());
    }

    #[test]
    fn spectral_efficiency_is_bits_times_rate() {
        let entry = McsEntry::new(5, ModulationScheme::Qam64, 0.5, 20.0, FecType::Ldpc);
        assert!((entry.spectral_efficiency() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn from_csv_parses_rows_and_sorts() {
        let csv_text = "mcs_index,modulation,code_rate,min_snr_db,fec_type\n\
                         1,qpsk,0.5,10.0,ldpc\n\
                         0,bpsk,0.5,5.0,ldpc\n";
        let table = McsTable::from_csv_reader(csv_text.as_bytes(), 2.0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].mcs_index, 0);
        assert_eq!(table.entries()[1].mcs_index, 1);
    }

    #[test]
    fn from_csv_defaults_fec_type_to_ldpc() {
        let csv_text = "mcs_index,modulation,code_rate,min_snr_db\n\
                         0,bpsk,0.5,5.0\n";
        let table = McsTable::from_csv_reader(csv_text.as_bytes(), 2.0).unwrap();
        assert_eq!(table.entries()[0].fec_type, FecType::Ldpc);
    }

    #[test]
    fn from_csv_rejects_empty_table() {
        let csv_text = "mcs_index,modulation,code_rate,min_snr_db,fec_type\n";
        assert!(matches!(
            McsTable::from_csv_reader(csv_text.as_bytes(), 2.0),
            Err(ConfigError::EmptyMcsTable)
        ));
    }
}
