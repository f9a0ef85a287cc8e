use serde::{Deserialize, Serialize};

use crate::core::error::ChartError;
use crate::core::psychrolib::{Psychrometrics, UnitSystem};

const CURVE_SAMPLES: usize = 120;
const WET_BULB_SWEEP_C: f64 = 80.0;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LineStyle {
    /// RGB or RGBA components in 0..1
    pub color: Vec<f64>,
    /// Line width in points
    pub linewidth: f64,
}

impl LineStyle {
    pub fn new(color: &[f64], linewidth: f64) -> Self {
        Self {
            color: color.to_vec(),
            linewidth,
        }
    }

    /// 8-bit RGB plus alpha; a missing alpha component means opaque.
    pub fn rgba(&self) -> (u8, u8, u8, f64) {
        let channel = |i: usize| {
            let v = self.color.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);
            (v * 255.0).round() as u8
        };
        let alpha = self.color.get(3).copied().unwrap_or(1.0).clamp(0.0, 1.0);
        (channel(0), channel(1), channel(2), alpha)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChartLimits {
    pub range_temp_c: [f64; 2],
    pub range_humidity_g_kg: [f64; 2],
    pub altitude_m: f64,
    pub step_temp: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChartParams {
    pub with_constant_rh: bool,
    pub with_constant_v: bool,
    pub with_constant_h: bool,
    pub with_constant_wet_temp: bool,
    pub with_zones: bool,

    /// Relative humidity lines, in percent
    pub constant_rh: Vec<f64>,
    /// kJ/kg
    pub range_h: [f64; 2],
    pub constant_h_step: f64,
    /// m³/kg
    pub range_vol_m3_kg: [f64; 2],
    pub constant_v_step: f64,
    /// °C
    pub range_wet_temp: [f64; 2],
    pub constant_wet_temp_step: f64,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self {
            with_constant_rh: true,
            with_constant_v: true,
            with_constant_h: true,
            with_constant_wet_temp: true,
            with_zones: false,
            constant_rh: (1..=9u8).map(|i| f64::from(i) * 10.0).collect(),
            range_h: [10.0, 200.0],
            constant_h_step: 10.0,
            range_vol_m3_kg: [0.78, 1.0],
            constant_v_step: 0.01,
            range_wet_temp: [-10.0, 45.0],
            constant_wet_temp_step: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChartConfig {
    pub limits: ChartLimits,
    pub saturation: LineStyle,
    pub constant_rh: LineStyle,
    pub constant_v: LineStyle,
    pub constant_h: LineStyle,
    pub constant_wet_temp: LineStyle,
    pub chart_params: ChartParams,
}

impl ChartConfig {
    /// The service's fixed chart layout with only the temperature axis
    /// taken from the caller.
    pub fn for_temperature_range(temp_min: f64, temp_max: f64) -> Self {
        Self {
            limits: ChartLimits {
                range_temp_c: [temp_min, temp_max],
                range_humidity_g_kg: [0.0, 30.0],
                altitude_m: 0.0,
                step_temp: 5.0,
            },
            saturation: LineStyle::new(&[0.0, 0.3, 1.0], 2.0),
            constant_rh: LineStyle::new(&[0.0, 0.5, 1.0, 0.7], 1.0),
            constant_v: LineStyle::new(&[0.2, 0.2, 0.2, 0.7], 0.5),
            constant_h: LineStyle::new(&[1.0, 0.4, 0.0, 0.7], 1.0),
            constant_wet_temp: LineStyle::new(&[0.0, 0.4, 0.0, 0.7], 1.0),
            chart_params: ChartParams::default(),
        }
    }
}

/// Figure dimensions in inches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FigureSize {
    pub width: f64,
    pub height: f64,
}

impl FigureSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self, dpi: f64) -> (u32, u32) {
        (
            (self.width * dpi).round() as u32,
            (self.height * dpi).round() as u32,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Saturation,
    ConstantRh,
    ConstantVolume,
    ConstantEnthalpy,
    ConstantWetBulb,
}

/// One drawn line, possibly split in several pieces by the chart box.
/// Points are (dry bulb °C, humidity ratio g/kg).
#[derive(Clone, Debug)]
pub struct Curve {
    pub label: String,
    pub segments: Vec<Vec<(f64, f64)>>,
}

#[derive(Clone, Debug)]
pub struct ChartLayer {
    pub kind: LayerKind,
    pub style: LineStyle,
    pub curves: Vec<Curve>,
}

/// Axis-aligned box in chart coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartBox {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

/// A computed psychrometric chart, ready to be drawn.
#[derive(Clone, Debug)]
pub struct PsychroChart {
    config: ChartConfig,
    figsize: FigureSize,
    pressure: f64,
    layers: Vec<ChartLayer>,
}

impl PsychroChart {
    pub fn new(
        config: ChartConfig,
        figsize: FigureSize,
        psychro: Psychrometrics,
    ) -> Result<Self, ChartError> {
        if psychro.units() != UnitSystem::Si {
            return Err(ChartError::invalid_input(
                "chart limits are expressed in SI units",
            ));
        }
        validate(&config, &psychro)?;

        let pressure = psychro.standard_atm_pressure(config.limits.altitude_m);
        let mut chart = Self {
            config,
            figsize,
            pressure,
            layers: Vec::new(),
        };
        chart.layers = chart.compute_layers(&psychro)?;

        Ok(chart)
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn figsize(&self) -> FigureSize {
        self.figsize
    }

    /// Total pressure at the configured altitude, in Pa.
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn layers(&self) -> &[ChartLayer] {
        &self.layers
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&ChartLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    pub fn bounds(&self) -> ChartBox {
        let limits = &self.config.limits;
        ChartBox {
            x: (limits.range_temp_c[0], limits.range_temp_c[1]),
            y: (limits.range_humidity_g_kg[0], limits.range_humidity_g_kg[1]),
        }
    }

    fn compute_layers(&self, psychro: &Psychrometrics) -> Result<Vec<ChartLayer>, ChartError> {
        let params = &self.config.chart_params;
        let mut layers = vec![ChartLayer {
            kind: LayerKind::Saturation,
            style: self.config.saturation.clone(),
            curves: vec![self.saturation_curve(psychro)?],
        }];

        if params.with_constant_rh {
            layers.push(ChartLayer {
                kind: LayerKind::ConstantRh,
                style: self.config.constant_rh.clone(),
                curves: self.constant_rh_curves(psychro)?,
            });
        }
        if params.with_constant_v {
            layers.push(ChartLayer {
                kind: LayerKind::ConstantVolume,
                style: self.config.constant_v.clone(),
                curves: self.constant_volume_curves(psychro)?,
            });
        }
        if params.with_constant_h {
            layers.push(ChartLayer {
                kind: LayerKind::ConstantEnthalpy,
                style: self.config.constant_h.clone(),
                curves: self.constant_enthalpy_curves(psychro)?,
            });
        }
        if params.with_constant_wet_temp {
            layers.push(ChartLayer {
                kind: LayerKind::ConstantWetBulb,
                style: self.config.constant_wet_temp.clone(),
                curves: self.constant_wet_bulb_curves(psychro)?,
            });
        }

        Ok(layers)
    }

    fn temperatures(&self) -> Vec<f64> {
        let [lo, hi] = self.config.limits.range_temp_c;
        linspace(lo, hi, CURVE_SAMPLES)
    }

    fn saturation_curve(&self, psychro: &Psychrometrics) -> Result<Curve, ChartError> {
        self.rh_curve(psychro, 100.0, "saturation".to_string())
    }

    fn constant_rh_curves(&self, psychro: &Psychrometrics) -> Result<Vec<Curve>, ChartError> {
        self.config
            .chart_params
            .constant_rh
            .iter()
            .map(|&rh| self.rh_curve(psychro, rh, format!("{}%", rh)))
            .collect()
    }

    fn rh_curve(&self, psychro: &Psychrometrics, rh: f64, label: String) -> Result<Curve, ChartError> {
        let mut points = Vec::with_capacity(CURVE_SAMPLES);
        for t in self.temperatures() {
            // above the boiling point at this pressure the ratio is undefined
            match psychro.hum_ratio_from_rel_hum(t, rh / 100.0, self.pressure) {
                Ok(w) => points.push((t, w * 1000.0)),
                Err(_) => break,
            }
        }
        Ok(Curve {
            label,
            segments: clip_polyline(&points, self.bounds()),
        })
    }

    /// Samples a line of constant property along the humidity ratio axis,
    /// from dry air up to the saturation curve.
    fn iso_line<F>(
        &self,
        psychro: &Psychrometrics,
        label: String,
        t_dry_bulb_at: F,
    ) -> Result<Curve, ChartError>
    where
        F: Fn(f64) -> Result<f64, ChartError>,
    {
        let w_max = self.config.limits.range_humidity_g_kg[1] / 1000.0;
        let mut points = Vec::with_capacity(CURVE_SAMPLES);

        for w in linspace(0.0, w_max, CURVE_SAMPLES) {
            let t = t_dry_bulb_at(w)?;
            let (t_lo, t_hi) = psychro.temperature_bounds();
            if !(t_lo..=t_hi).contains(&t) {
                break;
            }
            let saturated = match psychro.sat_hum_ratio(t, self.pressure) {
                Ok(w_sat) => w > w_sat,
                Err(_) => false,
            };
            if saturated {
                break;
            }
            points.push((t, w * 1000.0));
        }

        Ok(Curve {
            label,
            segments: clip_polyline(&points, self.bounds()),
        })
    }

    fn constant_enthalpy_curves(&self, psychro: &Psychrometrics) -> Result<Vec<Curve>, ChartError> {
        let params = &self.config.chart_params;
        stepped(params.range_h, params.constant_h_step)
            .into_iter()
            .map(|h| {
                self.iso_line(psychro, format!("{} kJ/kg", h), |w| {
                    Ok(psychro.t_dry_bulb_from_enthalpy_and_hum_ratio(h * 1000.0, w)?)
                })
            })
            .collect()
    }

    fn constant_volume_curves(&self, psychro: &Psychrometrics) -> Result<Vec<Curve>, ChartError> {
        let params = &self.config.chart_params;
        let pressure = self.pressure;
        stepped(params.range_vol_m3_kg, params.constant_v_step)
            .into_iter()
            .map(|v| {
                self.iso_line(psychro, format!("{:.2} m³/kg", v), |w| {
                    Ok(psychro.t_dry_bulb_from_moist_air_volume_and_hum_ratio(v, w, pressure)?)
                })
            })
            .collect()
    }

    fn constant_wet_bulb_curves(&self, psychro: &Psychrometrics) -> Result<Vec<Curve>, ChartError> {
        let params = &self.config.chart_params;
        let (_, t_hi) = psychro.temperature_bounds();
        let mut curves = Vec::new();

        for t_wet_bulb in stepped(params.range_wet_temp, params.constant_wet_temp_step) {
            let t_end = (t_wet_bulb + WET_BULB_SWEEP_C).min(t_hi);
            let mut points = Vec::with_capacity(CURVE_SAMPLES);
            for t in linspace(t_wet_bulb, t_end, CURVE_SAMPLES) {
                let w = match psychro.hum_ratio_from_t_wet_bulb(t, t_wet_bulb, self.pressure) {
                    Ok(w) => w,
                    Err(_) => break,
                };
                points.push((t, w * 1000.0));
                // the line ends on the dry air axis
                if w <= 1e-6 {
                    break;
                }
            }
            curves.push(Curve {
                label: format!("{} °C", t_wet_bulb),
                segments: clip_polyline(&points, self.bounds()),
            });
        }

        Ok(curves)
    }
}

fn validate(config: &ChartConfig, psychro: &Psychrometrics) -> Result<(), ChartError> {
    let limits = &config.limits;
    let [temp_min, temp_max] = limits.range_temp_c;
    let [hum_min, hum_max] = limits.range_humidity_g_kg;

    if !temp_min.is_finite() || !temp_max.is_finite() {
        return Err(ChartError::invalid_input("temperature limits must be finite numbers"));
    }
    if temp_min >= temp_max {
        return Err(ChartError::invalid_input(format!(
            "temp_min ({}) must be lower than temp_max ({})",
            temp_min, temp_max
        )));
    }
    psychro.check_temperature(temp_min)?;
    psychro.check_temperature(temp_max)?;

    if !hum_min.is_finite() || !hum_max.is_finite() || hum_min < 0.0 || hum_min >= hum_max {
        return Err(ChartError::invalid_input(format!(
            "invalid humidity range [{}, {}] g/kg",
            hum_min, hum_max
        )));
    }
    if !(limits.step_temp.is_finite() && limits.step_temp > 0.0) {
        return Err(ChartError::invalid_input("step_temp must be positive"));
    }
    let pressure = psychro.standard_atm_pressure(limits.altitude_m);
    if !(pressure.is_finite() && pressure > 0.0) {
        return Err(ChartError::invalid_input(format!(
            "altitude {} m is outside the standard atmosphere",
            limits.altitude_m
        )));
    }

    Ok(())
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Values from `range[0]` to `range[1]` inclusive, `step` apart.
fn stepped(range: [f64; 2], step: f64) -> Vec<f64> {
    if !(step.is_finite() && step > 0.0) || range[1] < range[0] {
        return Vec::new();
    }
    let count = ((range[1] - range[0]) / step + 1e-9).floor() as usize;
    (0..=count)
        // snap to the step grid so labels read 0.86 rather than 0.8600000001
        .map(|i| ((range[0] + step * i as f64) / step).round() * step)
        .collect()
}

/// Clips a polyline to `bounds`, returning the visible pieces in order.
pub fn clip_polyline(points: &[(f64, f64)], bounds: ChartBox) -> Vec<Vec<(f64, f64)>> {
    let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    if points.len() == 1 {
        if inside(points[0], bounds) {
            segments.push(vec![points[0]]);
        }
        return segments;
    }

    for pair in points.windows(2) {
        match clip_segment(pair[0], pair[1], bounds) {
            Some((a, b)) => {
                let continues = current.last().is_some_and(|&last| same_point(last, a));
                if !continues && !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                if current.is_empty() {
                    current.push(a);
                }
                current.push(b);
            }
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

fn inside((x, y): (f64, f64), bounds: ChartBox) -> bool {
    x >= bounds.x.0 && x <= bounds.x.1 && y >= bounds.y.0 && y <= bounds.y.1
}

fn same_point(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
}

/// Liang–Barsky segment clipping.
fn clip_segment(
    p0: (f64, f64),
    p1: (f64, f64),
    bounds: ChartBox,
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let edges = [
        (-dx, p0.0 - bounds.x.0),
        (dx, bounds.x.1 - p0.0),
        (-dy, p0.1 - bounds.y.0),
        (dy, bounds.y.1 - p0.1),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (p0.0 + t0 * dx, p0.1 + t0 * dy),
        (p0.0 + t1 * dx, p0.1 + t1 * dy),
    ))
}
