// Time-domain shapes for a single voice.
//
// Every curve is a pure function of absolute audio-clock time, the way
// parameter automation on a web-audio node behaves: the voice asks "what is
// my gain at t?" rather than stepping a state machine. That keeps a late or
// partially rendered voice consistent with when it was meant to start.

// Level exponential ramps aim for; an exponential curve can't reach zero.
pub const SILENCE_FLOOR: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    // One cycle over `phase` in `[0, 1)`, starting at or near zero.
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (std::f32::consts::TAU * phase).sin(),
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

// Oscillator frequency over time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PitchCurve {
    Fixed(f32),
    // Exponential glide from `from` Hz at `start` to `to` Hz at `end`, then held.
    Sweep { from: f32, to: f32, start: f64, end: f64 },
}

impl PitchCurve {
    pub fn freq_at(&self, t: f64) -> f32 {
        match *self {
            PitchCurve::Fixed(f) => f,
            PitchCurve::Sweep { from, to, start, end } => {
                if t <= start || end <= start {
                    from
                } else if t >= end {
                    to
                } else {
                    let x = ((t - start) / (end - start)) as f32;
                    from * (to / from).powf(x)
                }
            }
        }
    }
}

// Attack/decay amplitude envelope.
//
// Silent before `start`, linear rise to `peak` over `attack` seconds,
// exponential fall to `floor` at `decay_end`, then held at `floor` until the
// voice is stopped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub start: f64,
    pub attack: f64,
    pub peak: f32,
    pub decay_end: f64,
    pub floor: f32,
}

impl Envelope {
    pub fn new(start: f64, attack: f64, peak: f32, decay_end: f64) -> Self {
        let attack = attack.max(0.0);
        Self {
            start,
            attack,
            peak,
            // the decay can't finish before the attack does
            decay_end: decay_end.max(start + attack),
            floor: SILENCE_FLOOR,
        }
    }

    pub fn gain_at(&self, t: f64) -> f32 {
        if t < self.start || self.peak <= 0.0 {
            return 0.0;
        }
        let attack_end = self.start + self.attack;
        if t < attack_end {
            return self.peak * ((t - self.start) / self.attack) as f32;
        }
        if t < self.decay_end {
            let x = ((t - attack_end) / (self.decay_end - attack_end)) as f32;
            return self.peak * (self.floor / self.peak).powf(x);
        }
        self.floor
    }
}
