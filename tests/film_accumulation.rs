use approx::assert_relative_eq;
use cgmath::{Matrix3, SquareMatrix};
use pretty_assertions::assert_eq;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use spectral_pt::film::{Pixel, RgbFilm};
use spectral_pt::renderer::render_description;
use spectral_pt::scenes::cornell_box;
use spectral_pt::settings::{FilterKind, RenderSettings};
use spectral_pt::spectrum::{Rgb, RgbColorSpace, SampledSpectrum, SampledWavelengths, SRGB};
use spectral_pt::{Float, Point2i};

fn identity_space() -> &'static RgbColorSpace {
    Box::leak(Box::new(RgbColorSpace {
        name: "identity",
        rgb_from_xyz: Matrix3::identity(),
        xyz_from_rgb: Matrix3::identity(),
    }))
}

#[test]
fn zero_weight_samples_do_not_shift_the_average() -> anyhow::Result<()> {
    let mut film = RgbFilm::new((2, 1), identity_space())?;
    let p = Point2i::new(1, 0);
    film.add_rgb(p, Rgb::new(5.0, 5.0, 5.0), 0.0);
    film.add_rgb(p, Rgb::new(1.0, 1.0, 1.0), 1.0);
    assert_eq!(film.get_pixel_rgb(p), Rgb::new(1.0, 1.0, 1.0));
    assert_eq!(*film.pixel(Point2i::new(0, 0)), Pixel::default());
    Ok(())
}

#[test]
fn accumulation_order_does_not_change_the_average() -> anyhow::Result<()> {
    let mut rng = Xoshiro256Plus::seed_from_u64(23);
    let mut samples: Vec<(Rgb, Float)> = (0..1000)
        .map(|_| {
            let rgb = Rgb::new(rng.gen_range(0.0..100.0), rng.gen(), rng.gen());
            (rgb, rng.gen_range(0.0..2.0))
        })
        .collect();

    let p = Point2i::new(0, 0);
    let mut films = Vec::new();
    for _ in 0..2 {
        samples.shuffle(&mut rng);
        let mut film = RgbFilm::new((1, 1), identity_space())?;
        for &(rgb, weight) in &samples {
            film.add_rgb(p, rgb, weight);
        }
        films.push(film);
    }

    assert_relative_eq!(films[0].pixel(p).weight_sum, films[1].pixel(p).weight_sum, max_relative = 1e-9);
    assert_relative_eq!(films[0].get_pixel_rgb(p), films[1].get_pixel_rgb(p), max_relative = 1e-6);
    Ok(())
}

#[test]
fn spectral_samples_accumulate_per_pixel() -> anyhow::Result<()> {
    let mut film = RgbFilm::new((3, 3), &SRGB)?;
    let center = Point2i::new(1, 1);
    for i in 0..32 {
        let lambda = SampledWavelengths::sample_visible((i as Float + 0.5) / 32.0);
        film.add_sample(center, &SampledSpectrum::uniform(2.0), &lambda, 0.5);
    }
    assert_relative_eq!(film.pixel(center).weight_sum, 16.0);
    assert!(film.get_pixel_rgb(Point2i::new(0, 1)).is_black());

    let rgb = film.get_pixel_rgb(center);
    assert!(rgb.g() > 1.6 && rgb.g() < 2.4, "{:?}", rgb.values());
    Ok(())
}

#[test]
fn rendered_film_has_every_pixel_weighted() -> anyhow::Result<()> {
    let settings = RenderSettings {
        width: 12,
        height: 9,
        spp: 5,
        filter: FilterKind::Box,
        filter_radius: 0.5,
        threads: Some(3),
        ..RenderSettings::default()
    };
    let film = render_description(&cornell_box()?, &settings)?;
    assert_eq!(film.resolution(), Point2i::new(12, 9));
    for y in 0..9 {
        for x in 0..12 {
            let px = film.pixel(Point2i::new(x, y));
            assert_eq!(px.weight_sum, 5.0);
            assert!(px.rgb_sum.iter().all(|c| c.is_finite()));
        }
    }

    let image = film.to_rgb_image();
    assert_eq!(image.dimensions(), (12, 9));
    assert!(image.pixels().all(|p| p.0.iter().all(|c| c.is_finite())));
    Ok(())
}
