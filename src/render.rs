use crate::geometry::{Geometry, SlotKind};

/// Something that turns placed slots into a presentable form.
pub trait Renderer {
    type Output;

    fn render(&self, geometry: &Geometry) -> Self::Output;
}

/// Draws one text row per tensor, output on top, with columns aligned by physical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRenderer {
    pub value: char,
    pub padding: char,
    pub empty: char,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            value: '*',
            padding: 'o',
            empty: ' ',
        }
    }
}

impl TextRenderer {
    pub fn new(value: char, padding: char) -> Self {
        Self {
            value,
            padding,
            ..Default::default()
        }
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, geometry: &Geometry) -> String {
        let (lo, hi) = geometry.bounds();
        if lo > hi {
            return String::new();
        }

        let width = (hi - lo + 1) as usize;
        let label_width = geometry
            .tensors()
            .iter()
            .map(|t| t.name().chars().count())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for tensor in geometry.tensors().iter().rev() {
            let mut row = vec![self.empty; width];
            for slot in tensor.slots() {
                row[(slot.position - lo) as usize] = match slot.kind {
                    SlotKind::Value => self.value,
                    SlotKind::Padding => self.padding,
                };
            }

            let row: String = row.into_iter().collect();
            let line = format!("{:>label_width$} {row}", tensor.name());
            out.push_str(line.trim_end());
            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accumulator::accumulate,
        chain::{Chain, KnownSize, LayerSpec, Wings},
        rational::Rational,
        solver::solve_sizes,
    };

    fn geometry(layer: LayerSpec, known: KnownSize) -> Geometry {
        let chain = Chain::new([layer], known).unwrap();
        let acc = accumulate(&chain).unwrap();
        let sizes = solve_sizes(&chain).unwrap();
        Geometry::build(&chain, &acc, &sizes).unwrap()
    }

    #[test]
    fn renders_dilated_input_below_output() {
        let up = LayerSpec::upsampling(Rational::from_integer(2), Wings::new(0, 0), (0, 0))
            .unwrap()
            .with_name("up");
        let text = TextRenderer::default().render(&geometry(up, KnownSize::Output(5)));

        assert_eq!(text, "   up *****\ninput *o*o*\n");
    }

    #[test]
    fn renders_padding_and_custom_glyphs() {
        let down = LayerSpec::downsampling(Rational::from_integer(2), Wings::new(1, 1), (1, 1))
            .unwrap()
            .with_name("pool");
        let text = TextRenderer::new('#', '.').render(&geometry(down, KnownSize::Input(5)));

        assert_eq!(text, " pool  # # #\ninput .#####.\n");
    }
}
