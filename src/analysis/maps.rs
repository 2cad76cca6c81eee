//! Pieces shared by the circumpolar maps.

use ndarray::{Array2, Zip};

#[cfg(feature = "netcdf")]
use crate::grid::{LonLabel, MissingCircle};
#[cfg(feature = "netcdf")]
use crate::plot::{Panel, PlotError};

/// Grey level of land and ice shelves.
#[cfg(feature = "netcdf")]
pub(crate) const LAND_GREY: f64 = 0.6;

/// 1 where `condition` holds for `reference`, NaN elsewhere.
#[cfg(any(test, feature = "netcdf"))]
pub(crate) fn indicator<F>(reference: &Array2<f64>, condition: F) -> Array2<f64>
where
    F: Fn(f64) -> bool,
{
    let mut out = Array2::from_elem(reference.dim(), f64::NAN);
    Zip::from(&mut out).and(reference).for_each(|o, &r| {
        if condition(r) {
            *o = 1.0;
        }
    });
    out
}

/// `mask_rho` with ice shelf cavities set to 0, so 1 marks open ocean only.
#[cfg(any(test, feature = "netcdf"))]
pub(crate) fn open_ocean(mask_rho: &Array2<f64>, zice: &Array2<f64>) -> Array2<f64> {
    let mut out = mask_rho.clone();
    Zip::from(&mut out).and(zice).for_each(|m, &z| {
        if z != 0.0 {
            *m = 0.0;
        }
    });
    out
}

/// Grey land (and cavities) from `open_ocn`, then the polar hole.
#[cfg(feature = "netcdf")]
pub(crate) fn shade_land(
    panel: &mut Panel,
    x: &Array2<f64>,
    y: &Array2<f64>,
    open_ocn: &Array2<f64>,
    circle: &MissingCircle,
) -> Result<(), PlotError> {
    let land = indicator(open_ocn, |m| m != 1.0);
    panel.shade_mask(x, y, &land, LAND_GREY)?;
    let (x_reg, y_reg) = circle.regular_grid();
    panel.shade_mask(&x_reg, &y_reg, &circle.land_field(), LAND_GREY)?;
    Ok(())
}

/// Square window out to `bound` with no frame.
#[cfg(feature = "netcdf")]
pub(crate) fn circumpolar_window(panel: &mut Panel, bound: f64) {
    panel.set_limits(-bound, bound, -bound, bound).axis_off();
}

#[cfg(feature = "netcdf")]
pub(crate) fn label_longitudes(panel: &mut Panel, labels: &[LonLabel]) {
    for label in labels {
        let (x, y) = label.anchor();
        panel.annotate(x, y, label.text.clone(), label.rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_open_ocean_excludes_cavities() {
        let mask = array![[1.0, 1.0, 0.0]];
        let zice = array![[0.0, -200.0, 0.0]];
        assert_eq!(open_ocean(&mask, &zice), array![[1.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_indicator() {
        let field = array![[1.0, 0.0]];
        let land = indicator(&field, |m| m != 1.0);
        assert!(land[[0, 0]].is_nan());
        assert_eq!(land[[0, 1]], 1.0);
    }

    #[cfg(feature = "netcdf")]
    #[test]
    fn test_circumpolar_window_and_labels() {
        use crate::grid::default_lon_labels;

        let mut panel = Panel::new(100, 100);
        circumpolar_window(&mut panel, 27.0);
        let limits = panel.limits();
        assert_eq!((limits.x_min, limits.x_max), (-27.0, 27.0));
        assert_eq!((limits.y_min, limits.y_max), (-27.0, 27.0));

        let labels = default_lon_labels();
        label_longitudes(&mut panel, &labels);
        assert_eq!(panel.annotations().len(), labels.len());
        let last = &panel.annotations()[labels.len() - 1];
        let (x, y) = labels[labels.len() - 1].anchor();
        assert_eq!(last.text, "180°");
        assert!((last.x - x).abs() < 1e-12 && (last.y - y).abs() < 1e-12);
    }
}
