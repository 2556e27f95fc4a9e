use super::*;

#[test]
fn halving_needs_no_correction() {
    let out = retime_range(&[100, 100, 100], 0..=2, 150).unwrap();
    assert_eq!(out, vec![50, 50, 50]);
}

#[test]
fn uneven_split_lands_on_target() {
    let out = retime_range(&[33, 33, 34], 0..=2, 100).unwrap();
    assert_eq!(out.iter().sum::<u32>(), 100);
    assert!(out.iter().all(|&d| d >= MIN_FRAME_DELAY_MS));

    let out = retime_range(&[33, 33, 34], 0..=2, 101).unwrap();
    assert_eq!(out.iter().sum::<u32>(), 101);
    assert!(out.iter().all(|&d| (33..=35).contains(&d)));
}

#[test]
fn frames_outside_range_untouched() {
    let out = retime_range(&[70, 100, 100, 100, 70], 1..=3, 600).unwrap();
    assert_eq!(out, vec![70, 200, 200, 200, 70]);
}

#[test]
fn floor_is_respected() {
    let out = retime_range(&[100, 100, 100], 0..=2, 12).unwrap();
    assert_eq!(out, vec![10, 10, 10]);

    let out = retime_range(&[100, 10, 100], 0..=2, 50).unwrap();
    assert_eq!(out.iter().sum::<u32>(), 50);
    assert!(out.iter().all(|&d| d >= MIN_FRAME_DELAY_MS));
}

#[test]
fn zero_delays_split_evenly() {
    let out = retime_range(&[0, 0, 0, 0], 0..=3, 203).unwrap();
    assert_eq!(out.iter().sum::<u32>(), 203);
    assert!(out.iter().all(|&d| d == 50 || d == 51));
}

#[test]
fn bad_ranges_rejected() {
    assert!(retime_range(&[100, 100], 0..=2, 100).is_err());
    #[allow(clippy::reversed_empty_ranges)]
    let reversed = 2..=1;
    assert!(retime_range(&[100, 100, 100], reversed, 100).is_err());
    assert!(retime_range(&[], 0..=0, 100).is_err());
}

#[test]
fn uniform_delay() {
    assert_eq!(
        set_uniform_delay(&[30, 40, 50], 1..=2, 5).unwrap(),
        vec![30, 10, 10]
    );
    assert!(set_uniform_delay(&[30], 0..=1, 50).is_err());
}
