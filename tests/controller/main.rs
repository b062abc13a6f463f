
mod breakpoints;
mod replay;
mod session;
mod steps;
