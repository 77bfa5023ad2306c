pub mod plus_rgbw_pm;
