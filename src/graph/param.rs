// Copyright (c) 2024 Mike Tsao

//! Sample-accurate parameter automation.

use crate::types::{ParameterType, Seconds};
use serde::{Deserialize, Serialize};

/// One scheduled change to an [AudioParam].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue {
        #[allow(missing_docs)]
        value: ParameterType,
        #[allow(missing_docs)]
        time: Seconds,
    },
    /// Move in a straight line from the previous event's value, arriving at
    /// `value` at `time`.
    LinearRamp {
        #[allow(missing_docs)]
        value: ParameterType,
        #[allow(missing_docs)]
        time: Seconds,
    },
    /// Starting at `time`, approach `target` exponentially. After one
    /// `time_constant` the value has covered about 63% of the distance.
    SetTarget {
        #[allow(missing_docs)]
        target: ParameterType,
        #[allow(missing_docs)]
        time: Seconds,
        #[allow(missing_docs)]
        time_constant: ParameterType,
    },
}
impl AutomationEvent {
    /// When the event takes effect.
    pub fn time(&self) -> Seconds {
        match self {
            AutomationEvent::SetValue { time, .. }
            | AutomationEvent::LinearRamp { time, .. }
            | AutomationEvent::SetTarget { time, .. } => *time,
        }
    }
}

/// An automatable value belonging to a node: a gain, a pan position, a
/// frequency.
///
/// The parameter has an intrinsic value plus a time-ordered list of
/// [AutomationEvent]s. Its value at any time is the intrinsic value shaped by
/// whatever events have started by then, clamped to the parameter's range.
/// Signals connected to the parameter are added on top of that by the
/// [ProcessingContext](super::ProcessingContext).
#[derive(Clone, Debug, PartialEq)]
pub struct AudioParam {
    default_value: ParameterType,
    min_value: ParameterType,
    max_value: ParameterType,

    // Where evaluation starts. Events that are completely in the past get
    // folded into these.
    base_time: Seconds,
    base_value: ParameterType,

    events: Vec<AutomationEvent>,

    // The context time as of the last render block.
    now: Seconds,
}
impl AudioParam {
    /// A parameter starting at `default_value`, clamped to `min..=max`.
    pub fn new_with(default_value: ParameterType, min: ParameterType, max: ParameterType) -> Self {
        Self {
            default_value,
            min_value: min,
            max_value: max,
            base_time: Seconds::zero(),
            base_value: default_value.clamp(min, max),
            events: Default::default(),
            now: Seconds::zero(),
        }
    }

    /// An unbounded parameter.
    pub fn new_unbounded(default_value: ParameterType) -> Self {
        Self::new_with(default_value, ParameterType::MIN, ParameterType::MAX)
    }

    #[allow(missing_docs)]
    pub fn default_value(&self) -> ParameterType {
        self.default_value
    }
    #[allow(missing_docs)]
    pub fn min_value(&self) -> ParameterType {
        self.min_value
    }
    #[allow(missing_docs)]
    pub fn max_value(&self) -> ParameterType {
        self.max_value
    }

    /// The intrinsic value: what the parameter holds before any automation
    /// event that hasn't been reached yet.
    pub fn value(&self) -> ParameterType {
        self.base_value
    }

    /// Sets the intrinsic value immediately.
    pub fn set_value(&mut self, value: ParameterType) {
        self.base_value = self.clamp(value);
    }

    /// The scheduled events, in time order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    #[allow(missing_docs)]
    pub fn set_value_at_time(&mut self, value: ParameterType, time: Seconds) -> &mut Self {
        self.insert(AutomationEvent::SetValue { value, time });
        self
    }

    /// Schedules a ramp that ends at `value` at `time`. If the previous event
    /// is an exponential approach that has already begun, or there is no
    /// previous event at all, the ramp starts from wherever the parameter is
    /// right now.
    pub fn linear_ramp_to_value_at_time(
        &mut self,
        value: ParameterType,
        time: Seconds,
    ) -> &mut Self {
        let now = self.now;
        match self.last_event_at_or_before(time) {
            None => {
                self.base_time = self.base_time.max(now);
            }
            Some(AutomationEvent::SetTarget { time: start, .. }) if start <= now && now < time => {
                let anchor = self.value_at(now);
                self.insert(AutomationEvent::SetValue {
                    value: anchor,
                    time: now,
                });
            }
            _ => {}
        }
        self.insert(AutomationEvent::LinearRamp { value, time });
        self
    }

    /// Schedules an exponential approach toward `target`. A zero time
    /// constant jumps straight to the target.
    pub fn set_target_at_time(
        &mut self,
        target: ParameterType,
        time: Seconds,
        time_constant: ParameterType,
    ) -> &mut Self {
        self.insert(AutomationEvent::SetTarget {
            target,
            time,
            time_constant: time_constant.max(0.0),
        });
        self
    }

    /// Removes every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: Seconds) -> &mut Self {
        self.events.retain(|e| e.time() < time);
        self
    }

    /// The automated value at `time`, not including any connected signals.
    pub fn value_at(&self, time: Seconds) -> ParameterType {
        self.clamp(self.unclamped_value_at(time))
    }

    fn unclamped_value_at(&self, t: Seconds) -> ParameterType {
        let mut t_prev = self.base_time;
        let mut v_prev = self.base_value;
        for (i, event) in self.events.iter().enumerate() {
            match *event {
                AutomationEvent::SetValue { value, time } => {
                    if t < time {
                        return v_prev;
                    }
                    t_prev = time;
                    v_prev = value;
                }
                AutomationEvent::LinearRamp { value, time } => {
                    if t < time {
                        let span = (time - t_prev).0;
                        if span <= 0.0 {
                            return value;
                        }
                        let progress = ((t - t_prev).0 / span).clamp(0.0, 1.0);
                        return v_prev + (value - v_prev) * progress;
                    }
                    t_prev = time;
                    v_prev = value;
                }
                AutomationEvent::SetTarget {
                    target,
                    time,
                    time_constant,
                } => {
                    if t < time {
                        return v_prev;
                    }
                    // The approach runs until the next event takes over.
                    let end = self.events.get(i + 1).map(|e| e.time());
                    let until = match end {
                        Some(end) if t >= end => end,
                        _ => t,
                    };
                    let v = Self::approach(v_prev, target, (until - time).0, time_constant);
                    match end {
                        Some(end) if t >= end => {
                            t_prev = end;
                            v_prev = v;
                        }
                        _ => return v,
                    }
                }
            }
        }
        v_prev
    }

    fn approach(
        from: ParameterType,
        target: ParameterType,
        elapsed: f64,
        time_constant: ParameterType,
    ) -> ParameterType {
        if time_constant <= 0.0 {
            target
        } else {
            target + (from - target) * (-elapsed / time_constant).exp()
        }
    }

    /// Tells the parameter what time it is, and folds every event whose
    /// effect is settled by then into the intrinsic value.
    pub(crate) fn advance_to(&mut self, now: Seconds) {
        self.now = now;
        while let Some(first) = self.events.first().copied() {
            if first.time() > now {
                break;
            }
            let next_time = self.events.get(1).map(|e| e.time());
            match first {
                AutomationEvent::SetValue { value, time }
                | AutomationEvent::LinearRamp { value, time } => {
                    self.base_time = time;
                    self.base_value = value;
                }
                AutomationEvent::SetTarget { target, .. } => match next_time {
                    Some(next_time) if next_time <= now => {
                        self.base_value = self.unclamped_value_at(next_time);
                        self.base_time = next_time;
                    }
                    Some(_) => break,
                    None => {
                        let v = self.unclamped_value_at(now);
                        if (v - target).abs() > Self::SETTLED_EPSILON {
                            break;
                        }
                        self.base_time = now;
                        self.base_value = target;
                    }
                },
            }
            self.events.remove(0);
        }
    }

    const SETTLED_EPSILON: ParameterType = 1.0e-7;

    fn insert(&mut self, event: AutomationEvent) {
        // Events at the same time keep their scheduling order.
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }

    fn last_event_at_or_before(&self, time: Seconds) -> Option<AutomationEvent> {
        self.events.iter().rev().find(|e| e.time() <= time).copied()
    }

    fn clamp(&self, value: ParameterType) -> ParameterType {
        value.clamp(self.min_value, self.max_value)
    }
}
