// Threshold notifier - Milestone and tip events between two lifetime totals
//
// Display timing is left to the presentation side through each event's
// `delay` hint.
use std::time::Duration;

/// Carried between cycles by whoever drives the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NotifierState {
    /// No total seen yet. The first total becomes the baseline silently so a
    /// restart does not replay milestones for history already in the log.
    #[default]
    Uninitialized,
    Tracking {
        last_total: f64,
    },
}

impl NotifierState {
    pub fn last_total(&self) -> Option<f64> {
        match self {
            Self::Uninitialized => None,
            Self::Tracking { last_total } => Some(*last_total),
        }
    }
}

/// Conservation advice shown once the lifetime total reaches `liters`.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageTip {
    pub liters: f64,
    pub message: String,
}

impl UsageTip {
    pub fn new(liters: f64, message: impl Into<String>) -> Self {
        Self {
            liters,
            message: message.into(),
        }
    }
}

pub fn default_tips() -> Vec<UsageTip> {
    vec![
        UsageTip::new(
            5.0,
            "WARNING! 5 Liters Reached. You've exceeded the suggested usage limit. Reduce consumption immediately.",
        ),
        UsageTip::new(
            10.0,
            "Water Saving Tip: 10 Liters used. To save water, try turning off the tap while scrubbing dishes or brushing teeth.",
        ),
        UsageTip::new(
            25.0,
            "Water Saving Tip: 25 Liters used. Check for leaky faucets or pipes; small drips waste hundreds of liters a week.",
        ),
        UsageTip::new(
            50.0,
            "Water Saving Tip: 50 Liters used. Consider reducing your shower time to conserve significantly.",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    Milestone { liters: f64 },
    Tip { threshold: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub message: String,
    /// Suggested delay after the cycle before showing this event.
    pub delay: Option<Duration>,
}

/// Most milestone events reported for a single cycle. A larger jump reports
/// only the most recent ones.
pub const MAX_MILESTONE_BURST: i64 = 100;

#[derive(Debug, Clone)]
pub struct ThresholdNotifier {
    milestone_liters: f64,
    stagger: Duration,
    tips: Vec<UsageTip>,
}

impl ThresholdNotifier {
    pub fn new(milestone_liters: f64, stagger: Duration, mut tips: Vec<UsageTip>) -> Self {
        tips.sort_by(|a, b| a.liters.total_cmp(&b.liters));
        Self {
            milestone_liters,
            stagger,
            tips,
        }
    }

    /// Events for the move from the carried total to `new_total`, in order:
    /// milestones ascending, then tips ascending. `state` always ends up
    /// tracking `new_total`.
    pub fn check_thresholds(
        &self,
        new_total: f64,
        state: &mut NotifierState,
    ) -> Vec<NotificationEvent> {
        let Some(last_total) = state.last_total() else {
            *state = NotifierState::Tracking {
                last_total: new_total,
            };
            return Vec::new();
        };

        let mut events = self.milestones(last_total, new_total);
        events.extend(
            self.tips
                .iter()
                .filter(|tip| new_total >= tip.liters && last_total < tip.liters)
                .map(|tip| NotificationEvent {
                    kind: NotificationKind::Tip {
                        threshold: tip.liters,
                    },
                    message: tip.message.clone(),
                    delay: None,
                }),
        );

        *state = NotifierState::Tracking {
            last_total: new_total,
        };
        events
    }

    fn milestones(&self, last_total: f64, new_total: f64) -> Vec<NotificationEvent> {
        let last_step = (last_total / self.milestone_liters).floor();
        let new_step = (new_total / self.milestone_liters).floor();
        if !last_step.is_finite() || !new_step.is_finite() || new_step <= last_step {
            return Vec::new();
        }

        let (last_step, new_step) = (last_step as i64, new_step as i64);
        let first_step = (last_step + 1).max(new_step.saturating_sub(MAX_MILESTONE_BURST - 1));
        (first_step..=new_step)
            .map(|step| {
                let liters = step as f64 * self.milestone_liters;
                let position = u32::try_from(step - first_step).unwrap_or(u32::MAX);
                NotificationEvent {
                    kind: NotificationKind::Milestone { liters },
                    message: format!("Total usage has reached {} Liters.", liters),
                    delay: Some(self.stagger.saturating_mul(position)),
                }
            })
            .collect()
    }
}

impl Default for ThresholdNotifier {
    fn default() -> Self {
        Self::new(1.0, Duration::from_millis(500), default_tips())
    }
}
