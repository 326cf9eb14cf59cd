use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::range::{RangeType, TapRange, TapRangeAdder};
use super::{
    impl_range_action_adder, impl_remedial_action_adder, RangeAction, RangeActionCommon,
    RemedialAction, RemedialActionAdderFields, RemedialActionCommon,
};
use crate::crac::Crac;
use crate::error::{CracError, CracResult};
use crate::network::NetworkModel;
use crate::network_element::NetworkElement;

const ANGLE_TOLERANCE: f64 = 1e-3;

/// Phase-shifting transformer acting through its tap position.
///
/// Setpoints are angles (degrees); the tap-to-angle map converts in both
/// directions and is strictly monotonic over consecutive taps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PstRangeAction {
    common: RemedialActionCommon,
    range: RangeActionCommon,
    network_element: NetworkElement,
    ranges: Vec<TapRange>,
    initial_tap: i32,
    tap_to_angle: BTreeMap<i32, f64>,
}

impl PstRangeAction {
    pub fn network_element(&self) -> &NetworkElement {
        &self.network_element
    }

    pub fn ranges(&self) -> &[TapRange] {
        &self.ranges
    }

    pub fn initial_tap(&self) -> i32 {
        self.initial_tap
    }

    pub fn tap_to_angle_conversion_map(&self) -> &BTreeMap<i32, f64> {
        &self.tap_to_angle
    }

    pub fn convert_tap_to_angle(&self, tap: i32) -> CracResult<f64> {
        self.tap_to_angle.get(&tap).copied().ok_or_else(|| {
            CracError::InvalidData(format!(
                "Pst of Range Action {} does not have a tap {}",
                self.id(),
                tap
            ))
        })
    }

    /// Tap whose angle is closest to `angle`.
    pub fn convert_angle_to_tap(&self, angle: f64) -> CracResult<i32> {
        let (min_angle, max_angle) = self
            .tap_to_angle
            .values()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                (lo.min(*a), hi.max(*a))
            });
        if angle < min_angle - ANGLE_TOLERANCE || angle > max_angle + ANGLE_TOLERANCE {
            return Err(CracError::InvalidData(format!(
                "Angle value {:.4} is not in the range of minimum and maximum angle values [{:.4},{:.4}] of the phase tap changer {} steps",
                angle,
                min_angle,
                max_angle,
                self.network_element.id()
            )));
        }
        let mut best: Option<(i32, f64)> = None;
        for (tap, tap_angle) in &self.tap_to_angle {
            let distance = (tap_angle - angle).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((*tap, distance));
            }
        }
        best.map(|(tap, _)| tap).ok_or_else(|| {
            CracError::InvalidData(format!(
                "TapToAngleConversionMap of PST {} is empty",
                self.id()
            ))
        })
    }

    fn map_extent(&self) -> (i32, i32) {
        let min = self.tap_to_angle.keys().next().copied().unwrap_or(self.initial_tap);
        let max = self
            .tap_to_angle
            .keys()
            .next_back()
            .copied()
            .unwrap_or(self.initial_tap);
        (min, max)
    }

    /// Admissible `[min, max]` taps given the tap chosen at the previous instant
    pub fn admissible_taps(&self, previous_tap: i32) -> CracResult<(i32, i32)> {
        let (mut min, mut max) = self.map_extent();
        for range in &self.ranges {
            let (lo, hi) = range.anchored(self.initial_tap, previous_tap);
            min = min.max(lo);
            max = max.min(hi);
        }
        if min > max {
            return Err(CracError::InvalidData(format!(
                "PstRangeAction {} has no admissible tap: [{}, {}]",
                self.id(),
                min,
                max
            )));
        }
        Ok((min, max))
    }

    fn admissible_angles(&self, previous_angle: f64) -> CracResult<(f64, f64)> {
        let previous_tap = self.convert_angle_to_tap(previous_angle)?;
        let (min_tap, max_tap) = self.admissible_taps(previous_tap)?;
        Ok((
            self.convert_tap_to_angle(min_tap)?,
            self.convert_tap_to_angle(max_tap)?,
        ))
    }
}

impl RemedialAction for PstRangeAction {
    fn common(&self) -> &RemedialActionCommon {
        &self.common
    }

    fn network_elements(&self) -> Vec<&NetworkElement> {
        vec![&self.network_element]
    }
}

impl RangeAction for PstRangeAction {
    fn range_common(&self) -> &RangeActionCommon {
        &self.range
    }

    fn min_admissible_setpoint(&self, previous_instant_setpoint: f64) -> CracResult<f64> {
        let (a, b) = self.admissible_angles(previous_instant_setpoint)?;
        Ok(a.min(b))
    }

    fn max_admissible_setpoint(&self, previous_instant_setpoint: f64) -> CracResult<f64> {
        let (a, b) = self.admissible_angles(previous_instant_setpoint)?;
        Ok(a.max(b))
    }

    fn current_setpoint(&self, network: &dyn NetworkModel) -> CracResult<f64> {
        let tap = network.phase_tap_position(self.network_element.id())?;
        self.convert_tap_to_angle(tap)
    }

    fn apply(&self, network: &mut dyn NetworkModel, setpoint: f64) -> CracResult<()> {
        let tap = self.convert_angle_to_tap(setpoint)?;
        network.set_phase_tap_position(self.network_element.id(), tap)
    }

    fn range_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Builder for [`PstRangeAction`]
pub struct PstRangeActionAdder<'a> {
    crac: &'a mut Crac,
    fields: RemedialActionAdderFields,
    range: RangeActionCommon,
    network_element: Option<NetworkElement>,
    ranges: Vec<TapRange>,
    initial_tap: Option<i32>,
    tap_to_angle: Option<BTreeMap<i32, f64>>,
}

impl_remedial_action_adder!(PstRangeActionAdder);
impl_range_action_adder!(PstRangeActionAdder);

impl<'a> PstRangeActionAdder<'a> {
    pub(crate) fn new(crac: &'a mut Crac) -> Self {
        Self {
            crac,
            fields: RemedialActionAdderFields::default(),
            range: RangeActionCommon::default(),
            network_element: None,
            ranges: Vec::new(),
            initial_tap: None,
            tap_to_angle: None,
        }
    }

    pub fn with_network_element(mut self, id: impl Into<String>) -> Self {
        self.network_element = Some(NetworkElement::new(id, None));
        self
    }

    pub fn with_network_element_and_name(mut self, id: impl Into<String>, name: &str) -> Self {
        self.network_element = Some(NetworkElement::new(id, Some(name)));
        self
    }

    pub fn with_initial_tap(mut self, initial_tap: i32) -> Self {
        self.initial_tap = Some(initial_tap);
        self
    }

    pub fn with_tap_to_angle_conversion_map(
        mut self,
        map: impl IntoIterator<Item = (i32, f64)>,
    ) -> Self {
        self.tap_to_angle = Some(map.into_iter().collect());
        self
    }

    pub fn new_tap_range(self) -> TapRangeAdder<'a> {
        TapRangeAdder::new(self)
    }

    pub(crate) fn push_tap_range(&mut self, range: TapRange) {
        self.ranges.push(range);
    }

    fn missing(what: &str, method: &str) -> CracError {
        CracError::MissingField(format!(
            "Cannot add PstRangeAction without a {}. Please use {}() with a non null value",
            what, method
        ))
    }

    pub fn add(self) -> CracResult<&'a PstRangeAction> {
        let id = self.fields.require_id("PstRangeAction")?;
        self.fields.check_unique(self.crac, &id)?;
        self.fields.check_auto_speed("Pst range action")?;
        let network_element = self
            .network_element
            .ok_or_else(|| Self::missing("network element", "withNetworkElement"))?;
        let initial_tap = self
            .initial_tap
            .ok_or_else(|| Self::missing("initial tap", "withInitialTap"))?;
        let tap_to_angle = self
            .tap_to_angle
            .ok_or_else(|| Self::missing("tap to angle conversion map", "withTapToAngleConversionMap"))?;
        check_tap_to_angle_map(&id, initial_tap, &tap_to_angle)?;

        let mut ranges = self.ranges;
        if self.fields.all_rules_preventive() {
            let before = ranges.len();
            ranges.retain(|r| r.range_type() != RangeType::RelativeToPreviousInstant);
            if ranges.len() != before {
                warn!(
                    remedial_action = %id,
                    "RELATIVE_TO_PREVIOUS_INSTANT range filtered out of a preventive PST range action"
                );
            }
        }
        if ranges.is_empty() {
            warn!(remedial_action = %id, "range action has no range");
        }
        self.fields.warn_if_unusable(&id);

        let crac = self.crac;
        self.fields.register(crac, &[&network_element])?;
        debug!(remedial_action = %id, initial_tap, "adding PST range action");
        let action = PstRangeAction {
            common: self.fields.into_common(id.clone()),
            range: self.range,
            network_element,
            ranges,
            initial_tap,
            tap_to_angle,
        };
        Ok(crac.pst_range_actions.entry(id).or_insert(action))
    }
}

fn too_short(id: &str) -> CracError {
    CracError::InvalidData(format!(
        "TapToAngleConversionMap of PST {} should at least contain 2 entries.",
        id
    ))
}

fn check_tap_to_angle_map(id: &str, initial_tap: i32, map: &BTreeMap<i32, f64>) -> CracResult<()> {
    let (Some(&min_tap), Some(&max_tap)) = (map.keys().next(), map.keys().next_back()) else {
        return Err(too_short(id));
    };
    if map.len() < 2 {
        return Err(too_short(id));
    }
    if i64::from(max_tap) - i64::from(min_tap) + 1 != map.len() as i64 {
        return Err(CracError::InvalidData(format!(
            "TapToAngleConversionMap of PST {} should contain all the consecutive taps between {} and {}",
            id, min_tap, max_tap
        )));
    }
    let angles: Vec<f64> = map.values().copied().collect();
    let increasing = angles.windows(2).all(|w| w[1] > w[0]);
    let decreasing = angles.windows(2).all(|w| w[1] < w[0]);
    if !increasing && !decreasing {
        return Err(CracError::InvalidData(format!(
            "TapToAngleConversionMap of PST {} should be increasing or decreasing",
            id
        )));
    }
    if !map.contains_key(&initial_tap) {
        return Err(CracError::InvalidData(format!(
            "initialTap of PST {} must be included into its tapToAngleConversionMap",
            id
        )));
    }
    Ok(())
}
