//! End-to-end tests for nimarr.
//! These exercise the public API the way compiled model code uses it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nimarr::core::config::{self, MapResizePolicy, MismatchPolicy};
use nimarr::prelude::*;
use tracing::{info, Event, Level};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimarr_array=warn,nimarr_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Counts the error-level events it sees.
struct ErrorCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Test 1: Copy-construction produces an independent owned array
#[test]
fn test_round_trip_copy() {
    init_tracing();

    let mut a = NimArr3::<f64>::with_size([2, 3, 2]);
    for k in 0..2 {
        for j in 0..3 {
            for i in 0..2 {
                *a.at_mut([i, j, k]) = (100 * k + 10 * j + i) as f64;
            }
        }
    }

    let mut b = a.clone();
    assert_eq!(b.sizes(), a.sizes());
    assert_eq!(b, a);
    assert!(!b.storage().same_buffer(a.storage()));

    *b.at_mut([1, 2, 1]) = -1.0;
    assert_eq!(a.at([1, 2, 1]), 121.0);
    assert_ne!(b, a);

    info!("round trip copy verified");
    println!("✓ Copy-construction is independent");
}

/// Test 2: Writes through a map land in the source buffer
#[test]
fn test_map_aliasing() {
    init_tracing();

    let a = NimArr2::<f64>::with_size([4, 4]);
    let identity = a.storage().as_ptr();
    let mut m = NimArr2::map_of(&a, 0, [1, 4], [2, 2]).unwrap();

    *m.at_mut([0, 0]) = 9.0;
    *m.at_mut([1, 1]) = 7.0;

    assert_eq!(a.at([0, 0]), 9.0);
    assert_eq!(a.at([1, 1]), 7.0);
    assert_eq!(a.to_vec().iter().filter(|&&v| v != 0.0).count(), 2);
    assert_eq!(a.storage().as_ptr(), identity);
    assert_eq!(m.raw_parts().strides, &[1, 4]);

    println!("✓ Map aliasing works");
}

/// Test 3: A strided copy touches only the mapped window
#[test]
fn test_strided_copy_into_padded_buffer() {
    init_tracing();

    let padded = NimArr1::<f64>::filled([15], -1.0);
    let mut window = NimArr2::map_of(&padded, 0, [1, 5], [3, 3]).unwrap();
    let source = NimArr2::from_vec((1..=9).map(f64::from).collect(), [3, 3]).unwrap();

    window.assign(&source).unwrap();

    let values = padded.to_vec();
    for j in 0..3 {
        for i in 0..3 {
            assert_eq!(values[i + 5 * j], source.at([i, j]));
        }
    }
    for pad in [3, 4, 8, 9, 13, 14] {
        assert_eq!(values[pad], -1.0);
    }

    println!("✓ Strided copy stays inside its window");
}

/// Test 4: Converting copies truncate toward zero
#[test]
fn test_type_conversion() {
    init_tracing();

    let doubles = NimArr1::from_vec(vec![1.7, 2.3, -1.7], [3]).unwrap();
    let mut ints = NimArr1::<i32>::new();
    ints.assign(&doubles).unwrap();
    assert_eq!(ints.to_vec(), vec![1, 2, -1]);

    let flags: NimArr1<bool> = ints.cast().unwrap();
    assert_eq!(flags.to_vec(), vec![true, true, true]);

    let back: NimArr1<f64> = flags.cast().unwrap();
    assert_eq!(back.to_vec(), vec![1.0, 1.0, 1.0]);

    println!("✓ Type conversion is deterministic");
}

/// Test 5: Runtime-rank dispatch matches the typed copy
#[test]
fn test_dynamic_dispatch_equivalence() {
    init_tracing();

    let source = NimArr1::from_vec((0..24).collect::<Vec<i32>>(), [24]).unwrap();

    // Typed: transpose a 4x6 block into a 6x4 destination.
    let typed_dst = NimArr2::<f64>::with_size([6, 4]);
    let mut typed_map = NimArr2::map_of(&typed_dst, 0, [1, 6], [6, 4]).unwrap();
    let typed_src = NimArr2::map_of(&source, 0, [4, 1], [6, 4]).unwrap();
    typed_map.map_copy(&typed_src).unwrap();

    // Dynamic: same offsets, strides and extents through the runtime entry point.
    let mut dyn_dst = DynArray::from(NimArr2::<f64>::with_size([6, 4]));
    let dyn_src = DynArray::from(source.clone());
    dynamic_map_copy(
        &mut dyn_dst,
        &MapLayout::new(0, &[1, 6], &[6, 4]),
        &dyn_src,
        &MapLayout::new(0, &[4, 1], &[6, 4]),
    )
    .unwrap();

    assert_eq!(dyn_dst.to_f64_vec(), typed_dst.to_vec());

    let back = dyn_dst.into_typed::<2, f64>().unwrap();
    assert_eq!(back.at([5, 0]), 20.0);

    println!("✓ Dynamic dispatch matches typed copy");
}

/// Test 6: Mismatched extents are reported, never a crash
#[test]
fn test_shape_mismatch_diagnostic() {
    init_tracing();

    let mut dst = NimArr2::<f64>::with_size([2, 2]);
    let src = NimArr2::<f64>::filled([3, 3], 1.0);

    assert!(matches!(
        dst.map_copy(&src),
        Err(Error::ShapeMismatch { .. })
    ));
    assert_eq!(dst.to_vec(), vec![0.0; 4]);

    let _guard = ConfigGuard::new(
        ArrayConfig::default().with_shape_mismatch(MismatchPolicy::Proceed),
    );
    dst.map_copy(&src).unwrap();
    assert_eq!(dst.to_vec(), vec![1.0; 4]);

    println!("✓ Shape mismatch is reported");
}

/// Test 7: Resizing keeps the flat prefix and zero-fills the rest
#[test]
fn test_resize_semantics() {
    init_tracing();

    let mut a = NimArr2::from_vec(vec![1.0, 2.0, 3.0, 4.0], [2, 2]).unwrap();
    let identity = a.storage().as_ptr();
    a.set_size([3, 3], true, true).unwrap();

    assert_eq!(a.sizes(), [3, 3]);
    assert_eq!(a.to_vec()[..4], [1.0, 2.0, 3.0, 4.0]);
    assert!(a.to_vec()[4..].iter().all(|&v| v == 0.0));
    assert_eq!(a.storage().as_ptr(), identity);

    // Maps detach on resize unless the policy forbids it.
    let mut m = NimArr2::map_of(&a, 0, [1, 3], [2, 2]).unwrap();
    config::with_config(
        ArrayConfig::default().with_map_resize(MapResizePolicy::Forbid),
        || assert_eq!(m.resize([4, 4]), Err(Error::MapResize)),
    );
    assert!(m.is_map());

    m.resize([4, 4]).unwrap();
    assert!(!m.is_map());
    assert_eq!(a.at([0, 0]), 1.0);

    println!("✓ Resize semantics hold");
}

/// Test 8: Array lists resize rows independently
#[test]
fn test_array_list() {
    init_tracing();

    let mut list = VecNimArr::<2, i32>::with_len(3);
    list.set_row_dims(0, &[2, 2]).unwrap();
    list.set_row_dims(2, &[1, 5]).unwrap();
    assert!(list.set_row_dims(1, &[2]).is_err());

    assert_eq!(list.row_dims(0), vec![2, 2]);
    assert_eq!(list.row_dims(1), vec![0, 0]);
    assert_eq!(list.row_dims(2), vec![1, 5]);
    assert!(list.row_dims(3).is_empty());

    list[2].fill(3);
    assert_eq!(list.element(7).unwrap().len(), 4);
    assert_eq!(list[2].to_vec(), vec![3; 5]);

    println!("✓ Array list works");
}

/// Test 9: Policies can be read from the environment
#[test]
fn test_policies_from_environment() {
    init_tracing();

    let config = ArrayConfig::from_lookup(|key| match key {
        config::SHAPE_MISMATCH_ENV => Some("proceed".to_string()),
        config::MAP_RESIZE_ENV => Some("forbid".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.shape_mismatch, MismatchPolicy::Proceed);
    assert_eq!(config.map_resize, MapResizePolicy::Forbid);

    assert!(ArrayConfig::from_lookup(|_| Some("sometimes".to_string())).is_err());

    println!("✓ Environment policies parse");
}

/// Test 10: Out-of-range list access is reported as an error
#[test]
fn test_list_fallback_reports_error() {
    let errors = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(ErrorCounter(Arc::clone(&errors)));

    let mut list = VecNimArr::<1, f64>::new();
    list.push(NimArr1::filled([2], 4.0));

    tracing::subscriber::with_default(subscriber, || {
        assert_eq!(list.element(0).unwrap().len(), 2);
        assert_eq!(errors.load(Ordering::SeqCst), 0);

        assert_eq!(list.element(5).unwrap().to_vec(), vec![4.0, 4.0]);
        assert_eq!(list[3].len(), 2);
    });
    assert_eq!(errors.load(Ordering::SeqCst), 2);

    println!("✓ List fallback is reported as an error");
}
