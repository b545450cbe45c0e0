use super::frame::StereoFrame;

// A parameter that chases its target exponentially, one sample at a time.
// Same curve as a web-audio `setTargetAtTime` with time constant `tau`.
#[derive(Clone, Copy, Debug)]
pub struct Smoothed {
    pub value: f32,
    pub target: f32,
    coeff: f32, // fraction of the remaining distance covered per sample
}

impl Smoothed {
    pub fn new(value: f32, tau: f64, sample_rate: f32) -> Self {
        let coeff = if tau <= 0.0 {
            1.0
        } else {
            1.0 - (-1.0 / (tau * sample_rate as f64)).exp() as f32
        };
        Self { value, target: value, coeff }
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.coeff >= 1.0 {
            self.value = self.target;
        } else {
            self.value += (self.target - self.value) * self.coeff;
        }
        self.value
    }
}

// A track's persistent gain → pan stage. Voices sum into `input` during a
// frame; `take_frame` applies gain and pan and clears the input.
#[derive(Clone, Debug)]
pub struct Bus {
    gain: Smoothed,
    pan: Smoothed,
    input: f32,
}

impl Bus {
    // fresh buses sit at unity/centre, like a new gain node
    pub fn new(smoothing: f64, sample_rate: f32) -> Self {
        Self {
            gain: Smoothed::new(1.0, smoothing, sample_rate),
            pan: Smoothed::new(0.0, smoothing, sample_rate),
            input: 0.0,
        }
    }

    pub fn retarget(&mut self, gain: f32, pan: f32) {
        self.gain.target = gain.max(0.0);
        self.pan.target = pan.clamp(-1.0, 1.0);
    }

    #[inline]
    pub fn add(&mut self, sample: f32) {
        self.input += sample;
    }

    #[inline]
    pub fn take_frame(&mut self) -> StereoFrame {
        let gain = self.gain.next();
        let pan = self.pan.next();
        let out = StereoFrame::panned(self.input * gain, pan);
        self.input = 0.0;
        out
    }

    pub fn gain(&self) -> f32 {
        self.gain.value
    }

    pub fn pan(&self) -> f32 {
        self.pan.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    #[test]
    fn smoothing_reaches_63_percent_after_one_tau() {
        let mut s = Smoothed::new(0.0, 0.02, SR);
        s.target = 1.0;
        let one_tau = (0.02 * SR) as usize;
        for _ in 0..one_tau {
            s.next();
        }
        assert!((s.value - 0.632).abs() < 0.01, "{}", s.value);
        for _ in 0..(one_tau * 10) {
            s.next();
        }
        assert!((s.value - 1.0).abs() < 1e-3);
    }

    #[test]
    fn retarget_does_not_jump() {
        let mut bus = Bus::new(0.02, SR);
        bus.retarget(0.0, 1.0);
        bus.add(1.0);
        let first = bus.take_frame();
        assert!(bus.gain() > 0.99);
        assert!(first.peak() > 0.5);
    }

    #[test]
    fn input_is_cleared_per_frame() {
        let mut bus = Bus::new(0.0, SR);
        bus.add(0.5);
        bus.add(0.25);
        let f = bus.take_frame();
        assert!((f.left - 0.75 * std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert_eq!(bus.take_frame(), StereoFrame::zero());
    }

    #[test]
    fn zero_tau_jumps() {
        let mut bus = Bus::new(0.0, SR);
        bus.retarget(0.3, -1.0);
        bus.take_frame();
        assert_eq!(bus.gain(), 0.3);
        assert_eq!(bus.pan(), -1.0);
    }
}
