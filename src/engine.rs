pub mod one_to_all;
pub mod pareto_front;
