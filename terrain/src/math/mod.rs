mod geodesy;
mod linspace;

pub(crate) use {
    geodesy::{normalize_lon, FEET_PER_METER, METERS_PER_DEGREE, METERS_PER_NM},
    linspace::linspace,
};
