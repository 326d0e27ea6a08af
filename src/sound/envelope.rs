// Copyright (c) 2024 Mike Tsao

use crate::{graph::ProcessingContext, prelude::*};
use derivative::Derivative;
use log::debug;
use serde::{Deserialize, Serialize};

/// The shape of an attack-decay-sustain-hold-release curve. Every field is
/// non-negative once it has passed through an [Envelope].
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct EnvelopeSettings {
    /// How long the rise to `attack_level` takes.
    pub attack_time: Seconds,
    /// The peak.
    #[derivative(Default(value = "1.0"))]
    pub attack_level: ParameterType,
    /// How long the fall from the peak to `sustain_level` takes.
    #[derivative(Default(value = "Seconds(0.5)"))]
    pub decay_time: Seconds,
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.25"))]
    pub sustain_level: ParameterType,
    /// How long the sustain level holds after the decay.
    #[derivative(Default(value = "Seconds(0.25)"))]
    pub hold_time: Seconds,
    /// How long the fall to silence takes.
    #[derivative(Default(value = "Seconds(0.5)"))]
    pub release_time: Seconds,
}
impl EnvelopeSettings {
    fn sanitized(mut self) -> Self {
        self.attack_time = non_negative_time(self.attack_time);
        self.attack_level = self.attack_level.max(0.0);
        self.decay_time = non_negative_time(self.decay_time);
        self.sustain_level = self.sustain_level.max(0.0);
        self.hold_time = non_negative_time(self.hold_time);
        self.release_time = non_negative_time(self.release_time);
        self
    }
}

fn non_negative_time(seconds: Seconds) -> Seconds {
    Seconds(seconds.0.max(0.0))
}

/// A partial change to [EnvelopeSettings]. Fields left `None` keep their
/// current values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
#[allow(missing_docs)]
pub struct EnvelopeUpdate {
    pub attack_time: Option<Seconds>,
    pub attack_level: Option<ParameterType>,
    pub decay_time: Option<Seconds>,
    pub sustain_level: Option<ParameterType>,
    pub hold_time: Option<Seconds>,
    pub release_time: Option<Seconds>,
}

/// Schedules an ADSHR curve on any number of parameters.
///
/// The phases aren't tracked. They exist only as automation events on the
/// targets, and every activation starts over from the attack. Each phase
/// approaches its level exponentially with a time constant of one tenth of the
/// phase's length, so levels are approached but never quite reached.
///
/// Targets are [ParamId]s, not the parameters themselves. When a target's
/// node goes away, the next activation forgets it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Envelope {
    settings: EnvelopeSettings,
    targets: Vec<ParamId>,
}
impl Envelope {
    /// Gives the parameter a moment to glide back to zero before the attack
    /// begins, so that retriggering doesn't click.
    pub const SNAP_BACK: Seconds = Seconds(0.02);

    #[allow(missing_docs)]
    pub fn new_with(settings: EnvelopeSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            targets: Default::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &EnvelopeSettings {
        &self.settings
    }

    /// Applies whichever fields of `update` are set.
    pub fn set(&mut self, update: &EnvelopeUpdate) {
        let s = &self.settings;
        self.settings = EnvelopeSettings {
            attack_time: update.attack_time.unwrap_or(s.attack_time),
            attack_level: update.attack_level.unwrap_or(s.attack_level),
            decay_time: update.decay_time.unwrap_or(s.decay_time),
            sustain_level: update.sustain_level.unwrap_or(s.sustain_level),
            hold_time: update.hold_time.unwrap_or(s.hold_time),
            release_time: update.release_time.unwrap_or(s.release_time),
        }
        .sanitized();
    }

    #[allow(missing_docs)]
    pub fn attack_time(&self) -> Seconds {
        self.settings.attack_time
    }
    #[allow(missing_docs)]
    pub fn set_attack_time(&mut self, attack_time: Seconds) {
        self.settings.attack_time = non_negative_time(attack_time);
    }
    #[allow(missing_docs)]
    pub fn attack_level(&self) -> ParameterType {
        self.settings.attack_level
    }
    #[allow(missing_docs)]
    pub fn set_attack_level(&mut self, attack_level: ParameterType) {
        self.settings.attack_level = attack_level.max(0.0);
    }
    #[allow(missing_docs)]
    pub fn decay_time(&self) -> Seconds {
        self.settings.decay_time
    }
    #[allow(missing_docs)]
    pub fn set_decay_time(&mut self, decay_time: Seconds) {
        self.settings.decay_time = non_negative_time(decay_time);
    }
    #[allow(missing_docs)]
    pub fn sustain_level(&self) -> ParameterType {
        self.settings.sustain_level
    }
    #[allow(missing_docs)]
    pub fn set_sustain_level(&mut self, sustain_level: ParameterType) {
        self.settings.sustain_level = sustain_level.max(0.0);
    }
    #[allow(missing_docs)]
    pub fn hold_time(&self) -> Seconds {
        self.settings.hold_time
    }
    #[allow(missing_docs)]
    pub fn set_hold_time(&mut self, hold_time: Seconds) {
        self.settings.hold_time = non_negative_time(hold_time);
    }
    #[allow(missing_docs)]
    pub fn release_time(&self) -> Seconds {
        self.settings.release_time
    }
    #[allow(missing_docs)]
    pub fn set_release_time(&mut self, release_time: Seconds) {
        self.settings.release_time = non_negative_time(release_time);
    }

    /// Associates a parameter with the envelope. Adding one twice has no
    /// further effect.
    pub fn add_target(&mut self, target: ParamId) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    /// Forgets a parameter. Returns whether it was a target.
    pub fn remove_target(&mut self, target: ParamId) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| *t != target);
        self.targets.len() != before
    }

    #[allow(missing_docs)]
    pub fn targets(&self) -> &[ParamId] {
        &self.targets
    }

    /// Starts the curve on every target `when` from now (plus
    /// [Envelope::SNAP_BACK]). Anything already scheduled from that instant on
    /// is replaced.
    pub fn activate(&mut self, ctx: &mut ProcessingContext, when: Seconds) {
        self.targets.retain(|id| {
            let exists = ctx.param(*id).is_some();
            if !exists {
                debug!("Envelope dropping target {id}, which no longer exists");
            }
            exists
        });

        let s = &self.settings;
        let start = ctx.current_time() + when + Self::SNAP_BACK;
        let start_decay = start + s.attack_time;
        let start_release = start_decay + s.decay_time + s.hold_time;
        for id in self.targets.iter() {
            if let Some(param) = ctx.param_mut(*id) {
                param
                    .cancel_scheduled_values(start)
                    .linear_ramp_to_value_at_time(0.0, start)
                    .set_target_at_time(s.attack_level, start, s.attack_time.0 * 0.1)
                    .set_target_at_time(s.sustain_level, start_decay, s.decay_time.0 * 0.1)
                    .set_target_at_time(0.0, start_release, s.release_time.0 * 0.1);
            }
        }
    }

    /// Cancels everything scheduled on the targets from `when` from now
    /// onward. Whatever was scheduled last before then stays in effect.
    pub fn cancel(&self, ctx: &mut ProcessingContext, when: Seconds) {
        let time = ctx.current_time() + when;
        for id in self.targets.iter() {
            if let Some(param) = ctx.param_mut(*id) {
                param.cancel_scheduled_values(time);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AutomationEvent, ParamKind};
    use float_cmp::approx_eq;
    use more_asserts::{assert_gt, assert_lt};

    fn context_with_gain() -> (ProcessingContext, ParamId) {
        let mut ctx = ProcessingContext::new_with(crate::graph::ContextSettings {
            sample_rate: SampleRate::new(1000),
            start_suspended: false,
        });
        let gain = ctx.create_gain();
        let param = ctx.param_of(gain, ParamKind::Gain).unwrap();
        (ctx, param)
    }

    #[test]
    fn defaults() {
        let s = EnvelopeSettings::default();
        assert_eq!(s.attack_time, Seconds(0.0));
        assert_eq!(s.attack_level, 1.0);
        assert_eq!(s.decay_time, Seconds(0.5));
        assert_eq!(s.sustain_level, 0.25);
        assert_eq!(s.hold_time, Seconds(0.25));
        assert_eq!(s.release_time, Seconds(0.5));
    }

    #[test]
    fn values_are_clamped_non_negative() {
        let mut envelope = Envelope::new_with(EnvelopeSettings {
            attack_time: Seconds(-1.0),
            ..Default::default()
        });
        assert_eq!(envelope.attack_time(), Seconds(0.0));
        envelope.set(&EnvelopeUpdate {
            sustain_level: Some(-0.5),
            release_time: Some(Seconds(2.0)),
            ..Default::default()
        });
        assert_eq!(envelope.sustain_level(), 0.0);
        assert_eq!(envelope.release_time(), Seconds(2.0));
        assert_eq!(envelope.decay_time(), Seconds(0.5));
        envelope.set_hold_time(Seconds(-3.0));
        assert_eq!(envelope.hold_time(), Seconds(0.0));
    }

    #[test]
    fn activation_schedules_the_phases() {
        let (mut ctx, param) = context_with_gain();
        let mut envelope = Envelope::new_with(EnvelopeSettings {
            attack_time: Seconds(0.1),
            attack_level: 1.0,
            decay_time: Seconds(0.2),
            sustain_level: 0.5,
            hold_time: Seconds(0.3),
            release_time: Seconds(0.4),
        });
        envelope.add_target(param);
        envelope.activate(&mut ctx, Seconds(1.0));

        let events = ctx.param(param).unwrap().events().to_vec();
        assert_eq!(events.len(), 4);
        let t0 = 1.02;
        assert!(matches!(
            events[0],
            AutomationEvent::LinearRamp { value, time } if value == 0.0 && approx_eq!(f64, time.0, t0, epsilon = 1e-9)
        ));
        assert!(matches!(
            events[1],
            AutomationEvent::SetTarget { target, time, time_constant }
                if target == 1.0 && approx_eq!(f64, time.0, t0, epsilon = 1e-9) && approx_eq!(f64, time_constant, 0.01, epsilon = 1e-9)
        ));
        assert!(matches!(
            events[2],
            AutomationEvent::SetTarget { target, time, time_constant }
                if target == 0.5 && approx_eq!(f64, time.0, t0 + 0.1, epsilon = 1e-9) && approx_eq!(f64, time_constant, 0.02, epsilon = 1e-9)
        ));
        assert!(matches!(
            events[3],
            AutomationEvent::SetTarget { target, time, time_constant }
                if target == 0.0 && approx_eq!(f64, time.0, t0 + 0.6, epsilon = 1e-9) && approx_eq!(f64, time_constant, 0.04, epsilon = 1e-9)
        ));

        let p = ctx.param(param).unwrap();
        assert_gt!(p.value_at(Seconds(t0 + 0.09)), 0.99);
        assert_lt!((p.value_at(Seconds(t0 + 0.5)) - 0.5).abs(), 0.01);
        assert_lt!(p.value_at(Seconds(t0 + 1.2)), 0.01);
    }

    #[test]
    fn reactivation_replaces_the_first_schedule() {
        let (mut ctx, param) = context_with_gain();
        let mut envelope = Envelope::default();
        envelope.add_target(param);
        envelope.activate(&mut ctx, Seconds::zero());
        envelope.activate(&mut ctx, Seconds::zero());
        assert_eq!(ctx.param(param).unwrap().events().len(), 4);
    }

    #[test]
    fn missing_targets_are_pruned() {
        let (mut ctx, param) = context_with_gain();
        let doomed_node = ctx.create_gain();
        let doomed = ctx.param_of(doomed_node, ParamKind::Gain).unwrap();
        let mut envelope = Envelope::default();
        envelope.add_target(param);
        envelope.add_target(doomed);
        envelope.add_target(doomed);
        assert_eq!(envelope.targets().len(), 2);

        ctx.dispose_node(doomed_node);
        envelope.activate(&mut ctx, Seconds::zero());
        assert_eq!(envelope.targets(), &[param]);
        assert!(envelope.remove_target(param));
        assert!(!envelope.remove_target(param));
    }

    #[test]
    fn cancel_clears_the_future() {
        let (mut ctx, param) = context_with_gain();
        let mut envelope = Envelope::default();
        envelope.add_target(param);
        envelope.activate(&mut ctx, Seconds::zero());
        envelope.cancel(&mut ctx, Seconds(0.1));
        // Only the snap-back ramp and the attack, both at 0.02, survive.
        assert_eq!(ctx.param(param).unwrap().events().len(), 2);
    }
}
