use serde::{Deserialize, Serialize};

use crate::names::lenient_enum;

lenient_enum! {
    /// Where a modulation row reads its value from.
    ///
    /// The LFOs are audio-rate sources and only drive the `mix` target; every
    /// other source is a control-rate scalar in [-1, 1].
    pub enum ModSource {
        None = "none",
        Lfo1 = "lfo1",
        Lfo2 = "lfo2",
        ExprX = "expr-x",
        ExprY = "expr-y",
        SeqStep = "seq-step",
        Velocity = "velocity",
        Gate = "gate",
    }
    default = None;
}

impl ModSource {
    pub fn is_audio_rate(self) -> bool {
        matches!(self, ModSource::Lfo1 | ModSource::Lfo2)
    }
}

lenient_enum! {
    /// Patch parameters a modulation row (or an expression axis) can drive.
    pub enum ModTarget {
        None = "none",
        Mix = "mix",
        MacroHarmonics = "macro.harmonics",
        MacroTimbre = "macro.timbre",
        MacroMorph = "macro.morph",
        MacroLevel = "macro.level",
        FilterCutoff = "filter.cutoff",
        FilterQ = "filter.q",
        FmAmount = "fm.amount",
        RingAmount = "ring.amount",
        SubLevel = "sub.level",
        MasterGain = "master.gain",
        Osc1Fine = "osc1.fine",
        Osc2Fine = "osc2.fine",
        Lfo1Rate = "lfo1.rate",
        Lfo2Rate = "lfo2.rate",
        Lfo1Depth = "lfo1.depth",
        Lfo2Depth = "lfo2.depth",
        DelayMix = "delay.mix",
        ReverbMix = "reverb.mix",
        ArpGate = "arp.gate",
        SeqGate = "seq.gate",
    }
    default = None;
}

impl ModTarget {
    /// Valid domain of the parameter behind this target.
    pub fn range(self) -> (f32, f32) {
        match self {
            ModTarget::FilterCutoff => (20.0, 20_000.0),
            ModTarget::FilterQ => (0.1, 20.0),
            ModTarget::FmAmount => (0.0, 10.0),
            ModTarget::Osc1Fine | ModTarget::Osc2Fine => (-100.0, 100.0),
            ModTarget::Lfo1Rate | ModTarget::Lfo2Rate => (0.01, 40.0),
            ModTarget::ArpGate | ModTarget::SeqGate => (0.05, 1.0),
            _ => (0.0, 1.0),
        }
    }
}

/// One routing row of the modulation matrix. Rows are keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModMatrixRow {
    pub id: String,
    pub source: ModSource,
    pub target: ModTarget,
    pub amount: f32,
    pub enabled: bool,
}

impl Default for ModMatrixRow {
    fn default() -> Self {
        Self {
            id: String::new(),
            source: ModSource::None,
            target: ModTarget::None,
            amount: 0.0,
            enabled: true,
        }
    }
}

impl ModMatrixRow {
    pub fn new(id: impl Into<String>, source: ModSource, target: ModTarget, amount: f32) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            amount,
            enabled: true,
        }
    }

    /// A row that can actually move something.
    pub fn is_live(&self) -> bool {
        self.enabled
            && self.source != ModSource::None
            && self.target != ModTarget::None
            && self.amount != 0.0
    }
}

/// Clamp amounts and drop duplicate ids, keeping the last occurrence.
pub fn sanitize_rows(rows: &mut Vec<ModMatrixRow>) {
    for row in rows.iter_mut() {
        row.amount = if row.amount.is_finite() {
            row.amount.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    let mut seen = std::collections::HashSet::new();
    let mut keep: Vec<bool> = rows
        .iter()
        .rev()
        .map(|row| seen.insert(row.id.clone()))
        .collect();
    keep.reverse();
    let mut flags = keep.into_iter();
    rows.retain(|_| flags.next().unwrap_or(true));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_parse_with_labels() {
        let row: ModMatrixRow = serde_json::from_str(
            r#"{"id":"a","source":"velocity","target":"macro.harmonics","amount":0.5}"#,
        )
        .unwrap();
        assert_eq!(row.source, ModSource::Velocity);
        assert_eq!(row.target, ModTarget::MacroHarmonics);
        assert!(row.enabled);
        assert!(row.is_live());
    }

    #[test]
    fn unknown_labels_disable_the_row() {
        let row: ModMatrixRow =
            serde_json::from_str(r#"{"id":"b","source":"aftertouch","target":"mix","amount":1}"#)
                .unwrap();
        assert_eq!(row.source, ModSource::None);
        assert!(!row.is_live());
    }

    #[test]
    fn sanitize_clamps_and_dedupes() {
        let mut rows = vec![
            ModMatrixRow::new("a", ModSource::ExprX, ModTarget::Mix, 3.0),
            ModMatrixRow::new("b", ModSource::ExprY, ModTarget::Mix, f32::NAN),
            ModMatrixRow::new("a", ModSource::Gate, ModTarget::Mix, -0.25),
        ];
        sanitize_rows(&mut rows);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "b");
        assert_eq!(rows[0].amount, 0.0);
        assert_eq!(rows[1].source, ModSource::Gate);
        assert_eq!(rows[1].amount, -0.25);
    }
}
