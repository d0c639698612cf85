use std::any::Any;

use crate::complex::{self, ComplexShaper};
use crate::face::Face;
use crate::ot::{Map, MapBuilder};
use crate::{Script, Tag};

/// Per-(script, font) shaping state.
///
/// Immutable after construction; embedders may cache one per script and
/// share it across shape calls.
pub struct ShapePlan {
    pub script: Script,
    pub ot_map: Map,
    pub shaper: &'static ComplexShaper,
    data: Option<Box<dyn Any + Send + Sync>>,
}

impl ShapePlan {
    /// Builds a plan for shaping `script` with `face`.
    ///
    /// `chosen_script` is the GSUB script tag the font matched for this
    /// script (e.g. `deva` or `dev2`); the shaper uses it to decide between
    /// old-spec and new-spec behavior.
    pub fn new(face: &dyn Face, script: Script, chosen_script: Tag) -> Self {
        let shaper = complex::complex_shaper_for(script);

        let mut builder = MapBuilder::new(script, chosen_script);
        (shaper.collect_features)(&mut builder);
        let ot_map = builder.compile(face);

        let mut plan = ShapePlan {
            script,
            ot_map,
            shaper,
            data: None,
        };
        plan.data = Some((shaper.data_create)(&plan, face));
        plan
    }

    pub(crate) fn data<T: 'static>(&self) -> &T {
        self.data
            .as_ref()
            .and_then(|data| data.downcast_ref())
            .unwrap()
    }
}
