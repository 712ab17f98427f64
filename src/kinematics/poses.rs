//! Scripted pose library.
//!
//! A pose is a lead-in, a cycle repeated a fixed number of times and a lead-out,
//! always followed by the neutral pose. [`PoseRunner`] plays one without blocking:
//! it is polled once per control tick and issues every step whose hold has elapsed.
use core::fmt::Display;
use embassy_time::{Duration, Instant};
use log::{error, info};

use crate::robot::commands::{Button, SpeedProfile};
use crate::robot::config::{Calibration, STANCE_BASE};
use crate::robot::joint::JointId;
use crate::robot::servo::{ActuatorDriver, JointFrame, JointPipeline};

/// Target angle of one joint in a pose step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseAngle {
    /// Absolute angle in degrees.
    Fixed(f32),
    /// Offset from the joint's neutral angle at the current stance height.
    FromNeutral(f32),
}

impl PoseAngle {
    pub fn resolve(self, neutral: f32) -> f32 {
        match self {
            PoseAngle::Fixed(angle) => angle,
            PoseAngle::FromNeutral(delta) => neutral + delta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepTargets {
    Joints(&'static [(JointId, PoseAngle)]),
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseStep {
    pub targets: StepTargets,
    /// Time to wait after issuing the targets.
    pub hold_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub lead_in: &'static [PoseStep],
    pub cycle: &'static [PoseStep],
    pub repeats: usize,
    pub lead_out: &'static [PoseStep],
}

const CLOSING_NEUTRAL: PoseStep = PoseStep {
    targets: StepTargets::Neutral,
    hold_ms: 0,
};

impl Pose {
    /// Number of steps, the closing neutral included.
    pub fn len(&self) -> usize {
        self.lead_in.len() + self.cycle.len() * self.repeats + self.lead_out.len() + 1
    }

    pub fn step(&self, index: usize) -> Option<PoseStep> {
        let mut index = index;
        if index < self.lead_in.len() {
            return Some(self.lead_in[index]);
        }
        index -= self.lead_in.len();

        let cycled = self.cycle.len() * self.repeats;
        if index < cycled {
            return Some(self.cycle[index % self.cycle.len()]);
        }
        index -= cycled;

        if index < self.lead_out.len() {
            return Some(self.lead_out[index]);
        }
        (index == self.lead_out.len()).then_some(CLOSING_NEUTRAL)
    }

    pub fn duration(&self) -> Duration {
        let total: u64 = (0..self.len())
            .filter_map(|i| self.step(i))
            .map(|step| step.hold_ms)
            .sum();
        Duration::from_millis(total)
    }
}

// Macros rather than const fns so the step tables stay promotable to 'static.
macro_rules! fixed {
    ($id:literal, $angle:expr) => {
        (JointId($id), PoseAngle::Fixed($angle))
    };
}

macro_rules! lifted {
    ($id:literal, $delta:expr) => {
        (JointId($id), PoseAngle::FromNeutral($delta))
    };
}

const fn hold(targets: &'static [(JointId, PoseAngle)], hold_ms: u64) -> PoseStep {
    PoseStep {
        targets: StepTargets::Joints(targets),
        hold_ms,
    }
}

const fn pause(hold_ms: u64) -> PoseStep {
    hold(&[], hold_ms)
}

static HELLO: Pose = Pose {
    lead_in: &[
        hold(
            &[
                fixed!(1, 45.0),
                fixed!(2, 30.0),
                fixed!(3, 135.0),
                fixed!(4, 150.0),
                fixed!(5, 105.0),
                fixed!(6, 70.0),
                fixed!(7, 75.0),
                fixed!(8, 110.0),
            ],
            500,
        ),
        hold(&[fixed!(2, 90.0)], 0),
    ],
    // wave
    cycle: &[hold(&[fixed!(1, 10.0)], 500), hold(&[fixed!(1, 60.0)], 500)],
    repeats: 2,
    lead_out: &[pause(500)],
};

static PUSHUP: Pose = Pose {
    lead_in: &[hold(
        &[
            fixed!(1, 90.0),
            fixed!(2, 90.0),
            fixed!(3, 90.0),
            fixed!(4, 90.0),
            fixed!(5, 135.0),
            fixed!(6, 110.0),
            fixed!(7, 45.0),
            fixed!(8, 70.0),
        ],
        0,
    )],
    cycle: &[
        hold(&[fixed!(2, 90.0), fixed!(4, 90.0)], 700),
        hold(&[fixed!(2, 30.0), fixed!(4, 150.0)], 700),
    ],
    repeats: 3,
    lead_out: &[],
};

const BOUNCE_DOWN: PoseStep = hold(
    &[lifted!(2, 15.0), lifted!(4, -15.0), lifted!(6, -15.0), lifted!(8, 15.0)],
    500,
);

static BOUNCE: Pose = Pose {
    lead_in: &[],
    // one leg stays down on every bounce
    cycle: &[
        BOUNCE_DOWN,
        hold(
            &[lifted!(2, 25.0), lifted!(4, 15.0), lifted!(6, 15.0), lifted!(8, -15.0)],
            500,
        ),
        BOUNCE_DOWN,
        hold(
            &[lifted!(2, -15.0), lifted!(4, -25.0), lifted!(6, 15.0), lifted!(8, -15.0)],
            500,
        ),
        BOUNCE_DOWN,
        hold(
            &[lifted!(2, -15.0), lifted!(4, 15.0), lifted!(6, -25.0), lifted!(8, -15.0)],
            500,
        ),
        BOUNCE_DOWN,
        hold(
            &[lifted!(2, -15.0), lifted!(4, 15.0), lifted!(6, 15.0), lifted!(8, 25.0)],
            500,
        ),
    ],
    repeats: 1,
    lead_out: &[],
};

static SAY_NO: Pose = Pose {
    lead_in: &[],
    cycle: &[
        hold(
            &[fixed!(1, 75.0), fixed!(3, 165.0), fixed!(5, 165.0), fixed!(7, 75.0)],
            600,
        ),
        hold(
            &[fixed!(1, 15.0), fixed!(3, 105.0), fixed!(5, 105.0), fixed!(7, 15.0)],
            600,
        ),
    ],
    repeats: 1,
    lead_out: &[],
};

static DIVE: Pose = Pose {
    lead_in: &[],
    cycle: &[
        hold(
            &[
                fixed!(1, 75.0),
                fixed!(3, 105.0),
                fixed!(5, 165.0),
                fixed!(7, 15.0),
                lifted!(2, -20.0),
                lifted!(4, 20.0),
                lifted!(6, -20.0),
                lifted!(8, 20.0),
            ],
            500,
        ),
        hold(
            &[
                fixed!(1, 15.0),
                fixed!(3, 165.0),
                fixed!(5, 105.0),
                fixed!(7, 75.0),
                lifted!(2, 20.0),
                lifted!(4, -20.0),
                lifted!(6, 20.0),
                lifted!(8, -20.0),
            ],
            500,
        ),
    ],
    repeats: 3,
    lead_out: &[],
};

static FRONT_STEPS: Pose = Pose {
    lead_in: &[],
    cycle: &[
        hold(&[fixed!(2, 120.0), fixed!(4, 120.0)], 700),
        hold(&[fixed!(2, 60.0), fixed!(4, 60.0)], 700),
        CLOSING_NEUTRAL,
    ],
    repeats: 2,
    lead_out: &[],
};

static PLAY_DEAD: Pose = Pose {
    lead_in: &[hold(
        &[
            fixed!(1, 90.0),
            fixed!(2, 140.0),
            fixed!(3, 90.0),
            fixed!(4, 40.0),
            fixed!(5, 90.0),
            fixed!(6, 40.0),
            fixed!(7, 90.0),
            fixed!(8, 140.0),
        ],
        3000,
    )],
    cycle: &[],
    repeats: 0,
    lead_out: &[],
};

static TWO_LEG_UP: Pose = Pose {
    lead_in: &[hold(
        &[
            fixed!(1, 45.0),
            fixed!(2, 140.0),
            fixed!(3, 135.0),
            fixed!(4, 110.0),
            fixed!(5, 135.0),
            fixed!(6, 110.0),
            fixed!(7, 45.0),
            fixed!(8, 140.0),
        ],
        700,
    )],
    cycle: &[
        hold(&[fixed!(4, 60.0), fixed!(6, 140.0)], 700),
        hold(&[fixed!(4, 140.0), fixed!(6, 60.0)], 700),
    ],
    repeats: 2,
    lead_out: &[],
};

static TWO_LEG_MOVE: Pose = Pose {
    lead_in: &[hold(
        &[
            fixed!(1, 45.0),
            fixed!(2, 70.0),
            fixed!(3, 135.0),
            fixed!(4, 40.0),
            fixed!(5, 135.0),
            fixed!(6, 40.0),
            fixed!(7, 45.0),
            fixed!(8, 70.0),
        ],
        500,
    )],
    cycle: &[
        hold(&[fixed!(1, 75.0), fixed!(7, 75.0)], 700),
        hold(&[fixed!(1, 15.0), fixed!(7, 15.0)], 700),
    ],
    repeats: 2,
    lead_out: &[],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseKind {
    Hello,
    Pushup,
    Bounce,
    SayNo,
    Dive,
    FrontSteps,
    PlayDead,
    TwoLegUp,
    TwoLegMove,
}

impl PoseKind {
    pub const ALL: [PoseKind; 9] = [
        PoseKind::Hello,
        PoseKind::Pushup,
        PoseKind::Bounce,
        PoseKind::SayNo,
        PoseKind::Dive,
        PoseKind::FrontSteps,
        PoseKind::PlayDead,
        PoseKind::TwoLegUp,
        PoseKind::TwoLegMove,
    ];

    pub fn pose(self) -> &'static Pose {
        match self {
            PoseKind::Hello => &HELLO,
            PoseKind::Pushup => &PUSHUP,
            PoseKind::Bounce => &BOUNCE,
            PoseKind::SayNo => &SAY_NO,
            PoseKind::Dive => &DIVE,
            PoseKind::FrontSteps => &FRONT_STEPS,
            PoseKind::PlayDead => &PLAY_DEAD,
            PoseKind::TwoLegUp => &TWO_LEG_UP,
            PoseKind::TwoLegMove => &TWO_LEG_MOVE,
        }
    }
}

impl Display for PoseKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            PoseKind::Hello => "hello",
            PoseKind::Pushup => "pushup",
            PoseKind::Bounce => "bounce",
            PoseKind::SayNo => "say no",
            PoseKind::Dive => "dive",
            PoseKind::FrontSteps => "front steps",
            PoseKind::PlayDead => "play dead",
            PoseKind::TwoLegUp => "two legs up",
            PoseKind::TwoLegMove => "two legs move",
        };
        f.write_str(name)
    }
}

/// Button bindings of every pose bank, indexed by the pose sub-mode.
pub static POSE_BANKS: [&[(Button, PoseKind)]; 2] = [
    &[
        (Button::Cross, PoseKind::Hello),
        (Button::Circle, PoseKind::Pushup),
        (Button::Square, PoseKind::Bounce),
        (Button::Triangle, PoseKind::SayNo),
        (Button::L3, PoseKind::FrontSteps),
    ],
    &[
        (Button::Cross, PoseKind::Dive),
        (Button::Circle, PoseKind::PlayDead),
        (Button::Square, PoseKind::TwoLegUp),
        (Button::Triangle, PoseKind::TwoLegMove),
    ],
];

fn step_frame(targets: &[(JointId, PoseAngle)], calibration: &Calibration, h: f32) -> JointFrame {
    targets
        .iter()
        .map(|(id, angle)| {
            let neutral = calibration
                .joint(*id)
                .map_or(STANCE_BASE, |joint| joint.neutral.resolve(h));
            (*id, angle.resolve(neutral))
        })
        .collect()
}

/// Plays one pose, step by step, from the control loop.
#[derive(Debug, Clone)]
pub struct PoseRunner {
    kind: PoseKind,
    next_step: usize,
    deadline: Option<Instant>,
}

impl PoseRunner {
    pub fn new(kind: PoseKind) -> Self {
        info!(
            "pose {kind}: {} steps, {} ms",
            kind.pose().len(),
            kind.pose().duration().as_millis()
        );
        Self {
            kind,
            next_step: 0,
            deadline: None,
        }
    }

    pub fn kind(&self) -> PoseKind {
        self.kind
    }

    /// Issues every step due at `now`. Returns `true` once the closing neutral pose
    /// was issued. Transport failures are logged and the pose carries on.
    pub fn poll<D: ActuatorDriver>(
        &mut self,
        now: Instant,
        pipeline: &mut JointPipeline<'_, D>,
        stance_height: f32,
    ) -> bool {
        loop {
            if let Some(deadline) = self.deadline {
                if now < deadline {
                    return false;
                }
            }
            let Some(step) = self.kind.pose().step(self.next_step) else {
                info!("pose {} done", self.kind);
                return true;
            };

            let result = match step.targets {
                StepTargets::Joints(targets) => {
                    let frame = step_frame(targets, pipeline.calibration(), stance_height);
                    pipeline.command_frame(&frame, SpeedProfile::Normal)
                }
                StepTargets::Neutral => pipeline.neutral(stance_height),
            };
            if let Err(e) = result {
                error!("pose {} step {}: {e:?}", self.kind, self.next_step);
            }

            self.next_step += 1;
            self.deadline = Some(now + Duration::from_millis(step.hold_ms));
        }
    }
}
