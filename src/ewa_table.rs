//! 128-entry Gaussian lookup table for EWA texture filtering.
//! A texel at normalised squared radius r^2 in [0,1) contributes with
//! weight EWA_LUT[floor(128 * r^2)].

pub const EWA_LUT: [f32; 128] = [
    8.6466471676e-01,
    8.4904003715e-01,
    8.3365948815e-01,
    8.1851925530e-01,
    8.0361558374e-01,
    7.8894477727e-01,
    7.7450319745e-01,
    7.6028726269e-01,
    7.4629344735e-01,
    7.3251828090e-01,
    7.1895834701e-01,
    7.0561028274e-01,
    6.9247077770e-01,
    6.7953657322e-01,
    6.6680446153e-01,
    6.5427128502e-01,
    6.4193393537e-01,
    6.2978935285e-01,
    6.1783452555e-01,
    6.0606648859e-01,
    5.9448232344e-01,
    5.8307915716e-01,
    5.7185416170e-01,
    5.6080455320e-01,
    5.4992759129e-01,
    5.3922057842e-01,
    5.2868085920e-01,
    5.1830581972e-01,
    5.0809288690e-01,
    4.9803952789e-01,
    4.8814324939e-01,
    4.7840159707e-01,
    4.6881215495e-01,
    4.5937254479e-01,
    4.5008042551e-01,
    4.4093349262e-01,
    4.3192947763e-01,
    4.2306614749e-01,
    4.1434130404e-01,
    4.0575278347e-01,
    3.9729845578e-01,
    3.8897622426e-01,
    3.8078402494e-01,
    3.7271982611e-01,
    3.6478162780e-01,
    3.5696746129e-01,
    3.4927538864e-01,
    3.4170350215e-01,
    3.3424992397e-01,
    3.2691280555e-01,
    3.1969032726e-01,
    3.1258069788e-01,
    3.0558215418e-01,
    2.9869296049e-01,
    2.9191140824e-01,
    2.8523581557e-01,
    2.7866452689e-01,
    2.7219591250e-01,
    2.6582836813e-01,
    2.5956031461e-01,
    2.5339019741e-01,
    2.4731648632e-01,
    2.4133767502e-01,
    2.3545228072e-01,
    2.2965884383e-01,
    2.2395592754e-01,
    2.1834211748e-01,
    2.1281602141e-01,
    2.0737626882e-01,
    2.0202151062e-01,
    1.9675041880e-01,
    1.9156168610e-01,
    1.8645402569e-01,
    1.8142617083e-01,
    1.7647687460e-01,
    1.7160490953e-01,
    1.6680906736e-01,
    1.6208815868e-01,
    1.5744101269e-01,
    1.5286647687e-01,
    1.4836341671e-01,
    1.4393071541e-01,
    1.3956727366e-01,
    1.3527200928e-01,
    1.3104385703e-01,
    1.2688176831e-01,
    1.2278471089e-01,
    1.1875166868e-01,
    1.1478164146e-01,
    1.1087364465e-01,
    1.0702670903e-01,
    1.0323988055e-01,
    9.9512220056e-02,
    9.5842803059e-02,
    9.2230719527e-02,
    8.8675073643e-02,
    8.5174983587e-02,
    8.1729581316e-02,
    7.8338012352e-02,
    7.4999435567e-02,
    7.1713022974e-02,
    6.8477959525e-02,
    6.5293442906e-02,
    6.2158683338e-02,
    5.9072903385e-02,
    5.6035337755e-02,
    5.3045233115e-02,
    5.0101847901e-02,
    4.7204452139e-02,
    4.4352327257e-02,
    4.1544765912e-02,
    3.8781071814e-02,
    3.6060559551e-02,
    3.3382554421e-02,
    3.0746392262e-02,
    2.8151419293e-02,
    2.5596991945e-02,
    2.3082476706e-02,
    2.0607249961e-02,
    1.8170697842e-02,
    1.5772216069e-02,
    1.3411209805e-02,
    1.1087093508e-02,
    8.7992907830e-03,
    6.5472342427e-03,
    4.3303653644e-03,
    2.1481343520e-03,
    0.0000000000e+00,
];