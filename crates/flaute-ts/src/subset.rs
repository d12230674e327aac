use chrono::NaiveDateTime;
use flaute_core::{FlauteError, FlauteResult, GridDataset, IndexBox};
use ndarray::{s, Array2, Axis, Zip};
use tracing::debug;

/// Keep the time samples within `[start, end]` inclusive.
///
/// An empty result is an error: statistics over it would be undefined.
pub fn select_window(
    dataset: &GridDataset,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> FlauteResult<GridDataset> {
    let indices: Vec<usize> = dataset
        .times
        .iter()
        .enumerate()
        .filter(|(_, t)| **t >= start && **t <= end)
        .map(|(i, _)| i)
        .collect();
    if indices.is_empty() {
        return Err(FlauteError::EmptyWindow(format!(
            "{} has no samples between {start} and {end}",
            dataset.variable
        )));
    }
    debug!(
        variable = %dataset.variable,
        kept = indices.len(),
        of = dataset.len_time(),
        "selected time window"
    );
    Ok(dataset.select_times(&indices))
}

/// Crop to an index box. Bounds outside the grid are a precondition error.
pub fn crop(dataset: &GridDataset, index_box: &IndexBox) -> FlauteResult<GridDataset> {
    if index_box.y1 >= dataset.ny() || index_box.x1 >= dataset.nx() {
        return Err(FlauteError::Precondition(format!(
            "index box {} exceeds {}x{} grid of {}",
            index_box.to_tool_arg(),
            dataset.ny(),
            dataset.nx(),
            dataset.variable
        )));
    }
    let view = dataset.values.slice(s![
        ..,
        index_box.y0..=index_box.y1,
        index_box.x0..=index_box.x1
    ]);
    GridDataset::new(dataset.variable.clone(), dataset.times.clone(), view.to_owned())
}

/// Crop to the index box, then blank cells outside the mask.
///
/// Masked-out cells become NaN instead of being dropped, so the grid shape
/// survives and later spatial reductions stay well-defined.
pub fn select_region(
    dataset: &GridDataset,
    index_box: &IndexBox,
    mask: &Array2<bool>,
) -> FlauteResult<GridDataset> {
    let mut cropped = crop(dataset, index_box)?;
    apply_mask(&mut cropped, mask)?;
    Ok(cropped)
}

pub fn apply_mask(dataset: &mut GridDataset, mask: &Array2<bool>) -> FlauteResult<()> {
    if mask.dim() != (dataset.ny(), dataset.nx()) {
        return Err(FlauteError::Precondition(format!(
            "mask shape {:?} does not match {}x{} grid of {}",
            mask.dim(),
            dataset.ny(),
            dataset.nx(),
            dataset.variable
        )));
    }
    for mut field in dataset.values.axis_iter_mut(Axis(0)) {
        Zip::from(&mut field).and(mask).for_each(|v, &keep| {
            if !keep {
                *v = f64::NAN;
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::{array, Array3};

    fn yearly(years: &[i32]) -> GridDataset {
        let times: Vec<NaiveDateTime> = years
            .iter()
            .map(|y| {
                NaiveDate::from_ymd_opt(*y, 6, 1)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            })
            .collect();
        let n = times.len();
        GridDataset::new("tas", times, Array3::from_elem((n, 3, 4), 1.0)).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, sec)
            .unwrap()
    }

    #[test]
    fn window_is_inclusive() {
        let ds = yearly(&[1999, 2000, 2001, 2002]);
        let sub = select_window(&ds, at(2000, 1, 1, 0, 0, 0), at(2001, 12, 31, 23, 59, 59)).unwrap();
        assert_eq!(sub.len_time(), 2);
    }

    #[test]
    fn empty_window_is_an_error() {
        let ds = yearly(&[1999]);
        let err = select_window(&ds, at(2050, 1, 1, 0, 0, 0), at(2060, 12, 31, 23, 59, 59))
            .unwrap_err();
        assert!(matches!(err, FlauteError::EmptyWindow(_)));
    }

    #[test]
    fn region_selection_preserves_shape_and_blanks_masked_cells() {
        let ds = yearly(&[2000, 2001]);
        let bx = IndexBox::new(1, 2, 0, 1).unwrap();
        let mask = array![[true, false], [false, true]];
        let out = select_region(&ds, &bx, &mask).unwrap();
        assert_eq!(out.values.dim(), (2, 2, 2));
        assert_eq!(out.values[[0, 0, 0]], 1.0);
        assert!(out.values[[0, 0, 1]].is_nan());
        assert!(out.values[[1, 1, 0]].is_nan());
        assert_eq!(out.values[[1, 1, 1]], 1.0);
    }

    #[test]
    fn out_of_range_box_and_wrong_mask_are_preconditions() {
        let ds = yearly(&[2000]);
        let too_wide = IndexBox::new(0, 4, 0, 0).unwrap();
        assert!(crop(&ds, &too_wide).unwrap_err().is_fatal());
        let bx = IndexBox::new(0, 1, 0, 1).unwrap();
        let mask = Array2::from_elem((3, 3), true);
        assert!(select_region(&ds, &bx, &mask).unwrap_err().is_fatal());
    }
}
