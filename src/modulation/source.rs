use crate::patch::ModSource;

/// Value of an inactive unipolar source.
pub const INACTIVE: f32 = -1.0;

#[inline]
fn bipolar(unit: f32) -> f32 {
    (unit.clamp(0.0, 1.0) * 2.0) - 1.0
}

/// Process-wide control-rate source values, each in [-1, 1].
///
/// Velocity, gate and sequencer step map their 0..1 value onto the full
/// bipolar range, so -1 doubles as "nothing playing".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSources {
    pub expr_x: f32,
    pub expr_y: f32,
    pub expression_active: bool,
    pub seq_step: f32,
    pub velocity: f32,
    pub gate: f32,
}

impl Default for ControlSources {
    fn default() -> Self {
        Self {
            expr_x: 0.0,
            expr_y: 0.0,
            expression_active: false,
            seq_step: INACTIVE,
            velocity: INACTIVE,
            gate: INACTIVE,
        }
    }
}

impl ControlSources {
    pub fn value(&self, source: ModSource) -> f32 {
        match source {
            ModSource::ExprX => self.expr_x,
            ModSource::ExprY => self.expr_y,
            ModSource::SeqStep => self.seq_step,
            ModSource::Velocity => self.velocity,
            ModSource::Gate => self.gate,
            ModSource::None | ModSource::Lfo1 | ModSource::Lfo2 => 0.0,
        }
    }

    /// Pad position, each axis in [-1, 1].
    pub fn set_expression(&mut self, x: f32, y: f32) {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        self.expr_x = axis(x);
        self.expr_y = axis(y);
        self.expression_active = true;
    }

    pub fn clear_expression(&mut self) {
        self.expr_x = 0.0;
        self.expr_y = 0.0;
        self.expression_active = false;
    }

    /// Average velocity of the held notes, `None` when nothing is held.
    pub fn set_held(&mut self, average_velocity: Option<f32>) {
        match average_velocity {
            Some(velocity) => {
                self.velocity = bipolar(velocity);
                self.gate = 1.0;
            }
            None => {
                self.velocity = INACTIVE;
                self.gate = INACTIVE;
            }
        }
    }

    /// Velocity of the sequencer step just played; rests read as inactive.
    pub fn set_seq_step(&mut self, velocity: Option<f32>) {
        self.seq_step = velocity.map_or(INACTIVE, bipolar);
    }
}
