mod fps;
mod panels;

pub(super) use fps::FpsCounter;
pub(super) use panels::top_bar;
