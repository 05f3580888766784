// tests/unit_tests.rs
use gdal::raster::Buffer;
use lst_calc::error::LstError;
use lst_calc::processing::formulas::{
    blended_emissivity, broadband_emissivity, emissivity, fractional_vegetation, lst_celsius,
    ndvi, SOIL_EMISSIVITY, VEGETATION_EMISSIVITY,
};
use lst_calc::processing::indices::{
    BroadbandEmissivity, FractionalVegetation, LinearScale, VegetationEmissivity, NDI,
};
use lst_calc::processing::parallel::IndexCalculator;
use lst_calc::processing::{ParallelProcessor, Product, LST_C, NODATA};
use lst_calc::utils::fixed_point::{to_fixed_point, NODATA_INT};
use lst_calc::utils::gdal_ext::TypedBuffer;

/// Helper function to build an f32 input plane
fn plane(width: usize, height: usize, values: &[f32]) -> TypedBuffer {
    let data = (0..width * height)
        .map(|i| values[i % values.len()])
        .collect();
    TypedBuffer::F32(Buffer::new((width, height), data))
}

/// Helper function to extract result values from TypedBuffer
fn get_results(result: &TypedBuffer) -> Vec<f32> {
    match result {
        TypedBuffer::F32(buffer) => buffer.data().to_vec(),
        _ => panic!("Expected F32 buffer"),
    }
}

#[test]
fn test_lst_scaling_to_celsius() {
    let cases = [
        (15000.0, 26.85),
        (13657.5, 0.0),
        (16000.0, 46.85),
    ];
    for (raw, expected) in cases {
        let celsius = lst_celsius(raw);
        assert!(
            (celsius - expected).abs() < 1e-3,
            "LST {raw} -> expected {expected}, got {celsius}"
        );
    }
}

#[test]
fn test_emissivity_scaling() {
    assert!((emissivity(490.0) - 0.98).abs() < 1e-6);
    assert!((emissivity(495.0) - 0.99).abs() < 1e-6);
}

#[test]
fn test_broadband_emissivity_formula() {
    let bbe = broadband_emissivity(0.98, 0.99);
    assert!((bbe - 0.95348).abs() < 1e-5, "got {bbe}");

    // Typical land emissivities stay inside a plausible range
    for e31 in [0.94, 0.96, 0.98, 1.0] {
        for e32 in [0.94, 0.96, 0.98, 1.0] {
            let bbe = broadband_emissivity(e31, e32);
            assert!(bbe > 0.9 && bbe < 1.0, "BBE({e31}, {e32}) = {bbe}");
        }
    }
}

#[test]
fn test_ndvi_formula() {
    assert!((ndvi(5000.0, 2500.0).unwrap() - 0.33333).abs() < 1e-4);
    assert_eq!(ndvi(3000.0, 3000.0), Some(0.0));
    assert_eq!(ndvi(0.0, 0.0), None);
}

#[test]
fn test_fractional_vegetation_is_clamped_and_squared() {
    let (min, max) = (0.2, 0.8);
    assert_eq!(fractional_vegetation(0.1, min, max), 0.0);
    assert_eq!(fractional_vegetation(0.2, min, max), 0.0);
    assert!((fractional_vegetation(0.5, min, max) - 0.25).abs() < 1e-6);
    assert_eq!(fractional_vegetation(0.8, min, max), 1.0);
    assert_eq!(fractional_vegetation(0.95, min, max), 1.0);
}

#[test]
fn test_fractional_vegetation_is_monotonic() {
    let mut previous = -1.0;
    for step in 0..=100 {
        let value = -0.2 + step as f32 * 0.012;
        let fvc = fractional_vegetation(value, 0.1, 0.7);
        assert!((0.0..=1.0).contains(&fvc));
        assert!(fvc >= previous, "FVC decreased at NDVI {value}");
        previous = fvc;
    }
}

#[test]
fn test_fractional_vegetation_degenerate_range() {
    assert_eq!(fractional_vegetation(0.3, 0.4, 0.4), 0.0);
    assert_eq!(fractional_vegetation(0.4, 0.4, 0.4), 0.0);
    assert_eq!(fractional_vegetation(0.5, 0.4, 0.4), 1.0);
}

#[test]
fn test_blended_emissivity_endpoints() {
    let (veg, soil) = (VEGETATION_EMISSIVITY, SOIL_EMISSIVITY);
    assert_eq!(blended_emissivity(0.0, veg, soil), soil);
    assert!((blended_emissivity(1.0, veg, soil) - veg).abs() < 1e-7);

    let mid = blended_emissivity(0.5, veg, soil);
    assert!((mid - (veg + soil) / 2.0).abs() < 1e-6);
}

#[test]
fn test_linear_scale_calculator() {
    let inputs = [plane(2, 2, &[15000.0, 15500.0, NODATA, 14000.0])];
    let result = LinearScale::lst_celsius(0).calculate(&inputs).unwrap();
    let values = get_results(&result);

    let expected = [26.85, 36.85, NODATA, 6.85];
    for (i, (&got, &want)) in values.iter().zip(&expected).enumerate() {
        if want == NODATA {
            assert_eq!(got, NODATA, "NoData must pass through at index {i}");
        } else {
            assert!((got - want).abs() < 1e-3, "Expected {want}, got {got} at index {i}");
        }
    }
}

#[test]
fn test_bbe_calculator_propagates_nodata() {
    let inputs = [
        plane(2, 2, &[0.98, NODATA, 0.96, 0.98]),
        plane(2, 2, &[0.99, 0.99, 0.97, NODATA]),
    ];
    let result = BroadbandEmissivity::new(0, 1, None).calculate(&inputs).unwrap();
    let values = get_results(&result);

    assert!((values[0] - 0.95348).abs() < 1e-5);
    assert_eq!(values[1], NODATA);
    assert!((values[2] - broadband_emissivity(0.96, 0.97)).abs() < 1e-6);
    assert_eq!(values[3], NODATA);
}

#[test]
fn test_bbe_calculator_rejects_mismatched_grids() {
    let inputs = [plane(2, 2, &[0.98]), plane(4, 1, &[0.99])];
    let result = BroadbandEmissivity::new(0, 1, None).calculate(&inputs);
    assert!(matches!(result, Err(LstError::GridMismatch { .. })));
}

#[test]
fn test_ndi_calculation() {
    // NIR, RED, expected NDVI
    let test_cases = [
        (5000.0, 2500.0, 0.33333),
        (3000.0, 3000.0, 0.0),
        (1000.0, 500.0, 0.33333),
        (0.0, 0.0, NODATA),
    ];
    let nir: Vec<f32> = test_cases.iter().map(|(n, _, _)| *n).collect();
    let red: Vec<f32> = test_cases.iter().map(|(_, r, _)| *r).collect();
    let inputs = [plane(2, 2, &nir), plane(2, 2, &red)];

    let result = NDI::new(0, 1, None).calculate(&inputs).unwrap();
    let values = get_results(&result);

    for (i, (_, _, expected)) in test_cases.iter().enumerate() {
        if *expected == NODATA {
            assert_eq!(values[i], NODATA);
        } else {
            assert!(
                (values[i] - expected).abs() < 0.0001,
                "Expected {}, got {} at index {}",
                expected,
                values[i],
                i
            );
        }
    }
}

#[test]
fn test_fvc_and_vegetation_emissivity_chain() {
    let ndvi_plane = plane(2, 2, &[0.1, 0.4, 0.7, NODATA]);
    let fvc_calc = FractionalVegetation::new(0, 0.1, 0.7, None);
    assert_eq!(fvc_calc.ndvi_range(), (0.1, 0.7));

    let fvc = fvc_calc.calculate(&[ndvi_plane]).unwrap();
    let fvc_values = get_results(&fvc);
    assert_eq!(fvc_values[0], 0.0);
    assert!((fvc_values[1] - 0.25).abs() < 1e-5);
    assert_eq!(fvc_values[2], 1.0);
    assert_eq!(fvc_values[3], NODATA);

    let bbe = VegetationEmissivity::with_defaults(0).calculate(&[fvc]).unwrap();
    let bbe_values = get_results(&bbe);
    assert!((bbe_values[0] - SOIL_EMISSIVITY).abs() < 1e-6);
    assert!((bbe_values[2] - VEGETATION_EMISSIVITY).abs() < 1e-6);
    assert!(bbe_values[1] > SOIL_EMISSIVITY && bbe_values[1] < VEGETATION_EMISSIVITY);
    assert_eq!(bbe_values[3], NODATA);
}

#[test]
fn test_processor_checks_band_count() {
    let processor = ParallelProcessor::new(Some(1));
    let result = processor.apply(&BroadbandEmissivity::new(0, 1, None), &[plane(1, 1, &[0.98])]);

    match result {
        Err(LstError::NotEnoughBands {
            required, provided, ..
        }) => {
            assert_eq!(required, 2);
            assert_eq!(provided, 1);
        }
        other => panic!("expected NotEnoughBands, got {other:?}"),
    }
}

#[test]
fn test_calculator_rejects_integer_input() {
    let inputs = [TypedBuffer::I32(Buffer::new((1, 1), vec![15000]))];
    let result = LinearScale::lst_celsius(0).calculate(&inputs);
    assert!(matches!(result, Err(LstError::UnsupportedBuffer(_))));
}

#[test]
fn test_fixed_point_conversion() {
    let product = Product::new(LST_C, Buffer::new((2, 2), vec![26.85, NODATA, 400.0, -0.004]));
    assert_eq!(product.fixed_point_scale, 100.0);

    let fixed = to_fixed_point(product.data.data(), product.fixed_point_scale, NODATA_INT);
    assert_eq!(fixed[0], 2685);
    assert_eq!(fixed[1], NODATA_INT);
    // Clamped, never colliding with NoData
    assert_eq!(fixed[2], i16::MAX);
    assert_eq!(fixed[3], 0);
}

#[test]
fn test_processor_checks_input_grids() {
    let processor = ParallelProcessor::new(Some(1));
    let inputs = [plane(2, 2, &[0.98]), plane(1, 4, &[0.99])];
    let result = processor.apply(&BroadbandEmissivity::new(0, 1, None), &inputs);
    assert!(matches!(result, Err(LstError::GridMismatch { .. })));
}
