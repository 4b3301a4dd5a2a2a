/// Complex multiply-accumulate over interleaved spectra:
/// `acc[k] += x[k] * h[k]`, i.e. `(X·H − Y·G, X·G + Y·H)` per bin.
///
/// Bins are handled in independent groups of two so the compiler can keep
/// both products in flight and vectorize the body.
pub fn complex_multiply_accumulate(acc: &mut [f32], x: &[f32], h: &[f32]) {
    debug_assert!(x.len() >= acc.len());
    debug_assert!(h.len() >= acc.len());
    debug_assert!(acc.len() % 2 == 0);

    let mut acc_groups = acc.chunks_exact_mut(4);
    let mut x_groups = x.chunks_exact(4);
    let mut h_groups = h.chunks_exact(4);

    for ((a, x), h) in (&mut acc_groups).zip(&mut x_groups).zip(&mut h_groups) {
        let (x1, y1, h1, g1) = (x[0], x[1], h[0], h[1]);
        let (x2, y2, h2, g2) = (x[2], x[3], h[2], h[3]);

        a[0] += x1 * h1 - y1 * g1;
        a[1] += x1 * g1 + y1 * h1;
        a[2] += x2 * h2 - y2 * g2;
        a[3] += x2 * g2 + y2 * h2;
    }

    // Odd bin count
    let a = acc_groups.into_remainder();
    if a.len() == 2 {
        let x = x_groups.remainder();
        let h = h_groups.remainder();
        a[0] += x[0] * h[0] - x[1] * h[1];
        a[1] += x[0] * h[1] + x[1] * h[0];
    }
}

pub fn scale_buffer(buffer: &mut [f32], scale: f32) {
    for sample in buffer.iter_mut() {
        *sample *= scale;
    }
}
