//! Reading and writing control-rate targets on a patch.
//!
//! Values travel as `[osc1, osc2]` pairs so the macro targets can move both
//! oscillator slots from their own baselines. Single-field targets use the
//! first element.

use crate::patch::{ModTarget, Patch};

pub type TargetValue = [f32; 2];

pub fn read(target: ModTarget, patch: &Patch) -> Option<TargetValue> {
    let single = |v: f32| Some([v, v]);
    let (m1, m2) = (&patch.osc1.macro_settings, &patch.osc2.macro_settings);
    match target {
        ModTarget::None => None,
        ModTarget::Mix => single(patch.mix),
        ModTarget::MacroHarmonics => Some([m1.harmonics, m2.harmonics]),
        ModTarget::MacroTimbre => Some([m1.timbre, m2.timbre]),
        ModTarget::MacroMorph => Some([m1.morph, m2.morph]),
        ModTarget::MacroLevel => Some([m1.level, m2.level]),
        ModTarget::FilterCutoff => single(patch.filter.cutoff),
        ModTarget::FilterQ => single(patch.filter.q),
        ModTarget::FmAmount => single(patch.fm.amount),
        ModTarget::RingAmount => single(patch.ring.amount),
        ModTarget::SubLevel => single(patch.sub.level),
        ModTarget::MasterGain => single(patch.master.gain),
        ModTarget::Osc1Fine => single(patch.osc1.fine),
        ModTarget::Osc2Fine => single(patch.osc2.fine),
        ModTarget::Lfo1Rate => single(patch.lfo1.rate),
        ModTarget::Lfo2Rate => single(patch.lfo2.rate),
        ModTarget::Lfo1Depth => single(patch.lfo1.depth),
        ModTarget::Lfo2Depth => single(patch.lfo2.depth),
        ModTarget::DelayMix => single(patch.effects.delay.mix),
        ModTarget::ReverbMix => single(patch.effects.reverb.mix),
        ModTarget::ArpGate => single(patch.arp.gate),
        ModTarget::SeqGate => single(patch.sequencer.gate),
    }
}

pub fn write(target: ModTarget, patch: &mut Patch, value: TargetValue) {
    let [v, v2] = value;
    let (m1, m2) = (&mut patch.osc1.macro_settings, &mut patch.osc2.macro_settings);
    match target {
        ModTarget::None => {}
        ModTarget::Mix => patch.mix = v,
        ModTarget::MacroHarmonics => (m1.harmonics, m2.harmonics) = (v, v2),
        ModTarget::MacroTimbre => (m1.timbre, m2.timbre) = (v, v2),
        ModTarget::MacroMorph => (m1.morph, m2.morph) = (v, v2),
        ModTarget::MacroLevel => (m1.level, m2.level) = (v, v2),
        ModTarget::FilterCutoff => patch.filter.cutoff = v,
        ModTarget::FilterQ => patch.filter.q = v,
        ModTarget::FmAmount => patch.fm.amount = v,
        ModTarget::RingAmount => patch.ring.amount = v,
        ModTarget::SubLevel => patch.sub.level = v,
        ModTarget::MasterGain => patch.master.gain = v,
        ModTarget::Osc1Fine => patch.osc1.fine = v,
        ModTarget::Osc2Fine => patch.osc2.fine = v,
        ModTarget::Lfo1Rate => patch.lfo1.rate = v,
        ModTarget::Lfo2Rate => patch.lfo2.rate = v,
        ModTarget::Lfo1Depth => patch.lfo1.depth = v,
        ModTarget::Lfo2Depth => patch.lfo2.depth = v,
        ModTarget::DelayMix => patch.effects.delay.mix = v,
        ModTarget::ReverbMix => patch.effects.reverb.mix = v,
        ModTarget::ArpGate => patch.arp.gate = v,
        ModTarget::SeqGate => patch.sequencer.gate = v,
    }
}

/// `baseline + offset` spread over the target's range, clamped into it.
pub fn map(target: ModTarget, baseline: TargetValue, offset: f32) -> TargetValue {
    let (min, max) = target.range();
    baseline.map(|b| (b + offset * (max - min)).clamp(min, max))
}
